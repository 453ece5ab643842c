//! Planner backends
//!
//! A planner turns a natural-language instruction into an ordered list of
//! subtask actions. Backends:
//! - Ground truth: deterministic rule-based decomposition
//! - Human: operator builds the plan at the console
//! - Cohere / OpenAI: remote completion services
//!
//! Backends only *propose* actions. [`PlannerGateway`] is the single place
//! where proposals are validated against the action vocabulary.

mod cohere;
mod factory;
mod gateway;
mod ground_truth;
mod human;
mod llm;
mod openai;

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

use crate::domain::ActionVocabulary;
use crate::error::PlanningError;

pub use cohere::CohereBackend;
pub use factory::build_planner;
pub use gateway::PlannerGateway;
pub use ground_truth::GroundTruthPlanner;
pub use human::{HumanPlanner, LineSource, ScriptedLines};
pub use llm::{parse_plan_response, CompletionBackend, LlmPlanner, PLANNER_SYSTEM_PROMPT};
pub use openai::OpenAiBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlannerKind {
    GroundTruth,
    Human,
    Cohere,
    OpenAi,
}

impl PlannerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GroundTruth => "truth",
            Self::Human => "user",
            Self::Cohere => "cohere",
            Self::OpenAi => "openai",
        }
    }

    /// Remote backends cannot be used without an API key
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::Cohere | Self::OpenAi)
    }
}

impl Default for PlannerKind {
    fn default() -> Self {
        Self::OpenAi
    }
}

impl fmt::Display for PlannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlannerKind {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "truth" | "ground-truth" | "ground_truth" => Ok(Self::GroundTruth),
            "user" | "human" => Ok(Self::Human),
            "cohere" => Ok(Self::Cohere),
            "openai" => Ok(Self::OpenAi),
            _ => Err("invalid planner; expected truth|user|cohere|openai"),
        }
    }
}

/// Everything a planner may look at
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub env_description: &'a str,
    pub instruction: &'a str,
    pub vocabulary: &'a ActionVocabulary,
}

#[async_trait]
pub trait Planner: Send + Sync {
    fn kind(&self) -> PlannerKind;

    /// Propose an ordered list of action ids. Not yet validated.
    async fn propose(&self, request: &PlanRequest<'_>) -> std::result::Result<Vec<String>, PlanningError>;
}
