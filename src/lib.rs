pub mod checkpoints;
pub mod cli;
pub mod config;
mod console;
pub mod credentials;
pub mod domain;
pub mod environment;
pub mod error;
pub mod planner;
pub mod rollout;

pub use checkpoints::{extract_epoch, CheckpointResolver, CheckpointSelection};
pub use config::AppConfig;
pub use credentials::{load_credential, ApiKey};
pub use domain::{ActionPlan, ActionVocabulary, Checkpoint, RolloutOutcome, RolloutState};
pub use environment::{EnvironmentSession, ModelEnvironmentLoader, SessionReuse, TabletopLoader};
pub use error::{EvalError, PlanningError, Result};
pub use planner::{build_planner, Planner, PlannerGateway, PlannerKind};
pub use rollout::{EvaluationSummary, RolloutOrchestrator, RolloutSettings};
