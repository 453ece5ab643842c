use serde::{Deserialize, Serialize};
use std::fmt;

/// Rollout state machine states (one full cycle per checkpoint)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RolloutState {
    /// Waiting for the next checkpoint
    Idle,
    /// Environment reset, collecting description and action vocabulary
    EnvironmentReset,
    /// Planner invoked with the current instruction and vocabulary
    Planning,
    /// Plan shown to the operator, waiting for go-ahead
    AwaitingConfirmation,
    /// Plan actions being executed in order
    Executing,
    /// Summary emitted for this checkpoint
    Reported,
}

impl RolloutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RolloutState::Idle => "IDLE",
            RolloutState::EnvironmentReset => "ENVIRONMENT_RESET",
            RolloutState::Planning => "PLANNING",
            RolloutState::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            RolloutState::Executing => "EXECUTING",
            RolloutState::Reported => "REPORTED",
        }
    }

    /// Check if this state can transition to another state
    pub fn can_transition_to(&self, target: RolloutState) -> bool {
        use RolloutState::*;

        match (self, target) {
            (Idle, EnvironmentReset) => true,

            (EnvironmentReset, Planning) => true,

            // From Planning
            (Planning, AwaitingConfirmation) => true, // Operator review enabled
            (Planning, Executing) => true,            // Review skipped
            (Planning, Reported) => true,             // Planning failed

            // From AwaitingConfirmation
            (AwaitingConfirmation, Executing) => true, // Confirmed
            (AwaitingConfirmation, Reported) => true,  // Declined

            (Executing, Reported) => true,

            (Reported, Idle) => true,

            _ => false,
        }
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State transition event (for logging/debugging)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: RolloutState,
    pub to: RolloutState,
    pub reason: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl StateTransition {
    pub fn new(from: RolloutState, to: RolloutState, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}
