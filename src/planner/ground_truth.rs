//! Rule-based ground-truth planner
//!
//! Splits the instruction into clauses and maps every clause to the most
//! specific vocabulary action whose description words all occur in it.
//! The result depends only on the instruction and the vocabulary.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{PlanRequest, Planner, PlannerKind};
use crate::domain::ActionVocabulary;
use crate::error::PlanningError;

const CLAUSE_BREAKS: &[&str] = &["and", "then", "afterwards", "finally"];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "it", "its", "up", "to", "of", "please", "first", "next", "that", "this",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct GroundTruthPlanner;

impl GroundTruthPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Decompose `instruction` into vocabulary actions, in instruction order
    pub fn decompose(instruction: &str, vocabulary: &ActionVocabulary) -> Vec<String> {
        let candidates: Vec<(&str, BTreeSet<String>)> = vocabulary
            .entries()
            .iter()
            .map(|e| (e.id.as_str(), content_words(&e.description)))
            .filter(|(_, words)| !words.is_empty())
            .collect();

        let mut plan = Vec::new();
        for clause in split_clauses(instruction) {
            let words: BTreeSet<String> = clause.iter().cloned().collect();
            // Most specific match wins; earlier vocabulary entries win ties.
            let best = candidates
                .iter()
                .filter(|(_, required)| required.is_subset(&words))
                .fold(None::<&(&str, BTreeSet<String>)>, |best, candidate| match best {
                    Some(b) if b.1.len() >= candidate.1.len() => Some(b),
                    _ => Some(candidate),
                });

            match best {
                Some((id, _)) => {
                    debug!("Clause {:?} -> {}", clause.join(" "), id);
                    plan.push(id.to_string());
                }
                None => warn!("No action matches clause {:?}", clause.join(" ")),
            }
        }
        plan
    }
}

#[async_trait]
impl Planner for GroundTruthPlanner {
    fn kind(&self) -> PlannerKind {
        PlannerKind::GroundTruth
    }

    async fn propose(&self, request: &PlanRequest<'_>) -> Result<Vec<String>, PlanningError> {
        let plan = Self::decompose(request.instruction, request.vocabulary);
        if plan.is_empty() {
            return Err(PlanningError::Unparseable(format!(
                "no action matches instruction '{}'",
                request.instruction
            )));
        }
        Ok(plan)
    }
}

fn normalize(word: &str) -> Option<String> {
    let word: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if word.is_empty() {
        return None;
    }
    let canonical = match word.as_str() {
        "pick" | "grab" | "grasp" | "take" | "lift" => "lift",
        "put" | "place" | "drop" | "store" => "place",
        "bulb" | "lamp" | "lightbulb" => "lightbulb",
        "switch" | "turn" => "turn",
        "into" | "inside" => "in",
        "onto" => "on",
        other => other,
    };
    Some(canonical.to_string())
}

fn content_words(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .filter_map(normalize)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Split into clauses of normalised content words
fn split_clauses(instruction: &str) -> Vec<Vec<String>> {
    let mut clauses = Vec::new();
    for segment in instruction.split(|c| matches!(c, ',' | ';' | '.')) {
        let mut current = Vec::new();
        for word in segment.split_whitespace().filter_map(normalize) {
            if CLAUSE_BREAKS.contains(&word.as_str()) {
                if !current.is_empty() {
                    clauses.push(std::mem::take(&mut current));
                }
                continue;
            }
            if !STOPWORDS.contains(&word.as_str()) {
                current.push(word);
            }
        }
        if !current.is_empty() {
            clauses.push(current);
        }
    }
    clauses
}
