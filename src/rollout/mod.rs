//! Rollout orchestration
//!
//! For each checkpoint: reset the environment, obtain a plan through the
//! [`crate::planner::PlannerGateway`], optionally wait for the operator, execute
//! every action in order and hand the result to the report sinks.

mod confirmation;
mod orchestrator;
mod report;

pub use confirmation::{AutoConfirm, ConsoleConfirmation, PlanConfirmation};
pub use orchestrator::{execute_plan, RolloutOrchestrator, RolloutSettings};
pub use report::{
    CheckpointReport, ConsoleReporter, EvaluationSummary, JsonlReporter, ReportSink, SkipReason,
};
