use thiserror::Error;

/// Main error type for the evaluation runner
#[derive(Error, Debug)]
pub enum EvalError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Checkpoint resolution errors
    #[error("No checkpoints found: {0}")]
    NotFound(String),

    // Planning errors (recoverable per checkpoint)
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    // Simulation errors
    #[error("Environment fault: {0}")]
    EnvironmentFault(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvalError {
    /// Whether the error must abort the whole evaluation run.
    ///
    /// Planning failures are confined to the checkpoint that produced them;
    /// everything else leaves the loop without an observable environment.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EvalError::Planning(_))
    }
}

/// Result type alias for EvalError
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while turning an instruction into an action plan
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("Planner backend unreachable: {0}")]
    Unreachable(String),

    #[error("Planner backend returned an empty response")]
    EmptyResponse,

    #[error("Could not parse planner response: {0}")]
    Unparseable(String),

    #[error("Action '{action}' is not in the action vocabulary")]
    UnknownAction { action: String },

    #[error("Planner '{planner}' requires an API key")]
    MissingCredential { planner: String },

    #[error("Planning cancelled by operator")]
    Cancelled,

    #[error("Planner backend error: {0}")]
    Backend(String),
}

impl From<reqwest::Error> for PlanningError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            PlanningError::Unreachable(err.to_string())
        } else {
            PlanningError::Backend(err.to_string())
        }
    }
}
