use chrono::Utc;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use super::{CheckpointReport, EvaluationSummary, PlanConfirmation, ReportSink, SkipReason};
use crate::checkpoints::extract_epoch;
use crate::domain::{ActionPlan, Checkpoint, RolloutOutcome, RolloutState, StateTransition};
use crate::environment::{
    EnvironmentSession, LoadRequest, LoadedModel, ModelEnvironmentLoader, Policy, SessionReuse,
};
use crate::error::{EvalError, Result};
use crate::planner::PlannerGateway;

/// Where and how policies are loaded
#[derive(Debug, Clone)]
pub struct RolloutSettings {
    pub train_folder: PathBuf,
    pub dataset_path: Option<PathBuf>,
    pub device: u32,
    pub instruction: String,
    pub session_reuse: SessionReuse,
}

/// Drives one plan-and-execute cycle per checkpoint
pub struct RolloutOrchestrator {
    settings: RolloutSettings,
    loader: Box<dyn ModelEnvironmentLoader>,
    gateway: PlannerGateway,
    /// `None` skips the confirmation step
    confirmation: Option<Box<dyn PlanConfirmation>>,
    sinks: Vec<Box<dyn ReportSink>>,
    session: Option<Box<dyn EnvironmentSession>>,
    state: RolloutState,
    transitions: Vec<StateTransition>,
}

impl RolloutOrchestrator {
    pub fn new(
        settings: RolloutSettings,
        loader: Box<dyn ModelEnvironmentLoader>,
        gateway: PlannerGateway,
    ) -> Self {
        Self {
            settings,
            loader,
            gateway,
            confirmation: None,
            sinks: Vec::new(),
            session: None,
            state: RolloutState::Idle,
            transitions: Vec::new(),
        }
    }

    pub fn with_confirmation(mut self, confirmation: Box<dyn PlanConfirmation>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn state(&self) -> RolloutState {
        self.state
    }

    /// Transition history of the run
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    fn transition(&mut self, to: RolloutState, reason: &str) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(EvalError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        debug!("State {} -> {} ({})", self.state, to, reason);
        self.transitions.push(StateTransition::new(self.state, to, reason));
        self.state = to;
        Ok(())
    }

    /// Evaluate every checkpoint in order.
    ///
    /// Planning failures are reported and the loop moves on; any other error
    /// ends the run.
    pub async fn run(&mut self, checkpoints: &[Checkpoint]) -> Result<EvaluationSummary> {
        let mut summary = EvaluationSummary::default();
        for (i, checkpoint) in checkpoints.iter().enumerate() {
            info!("Checkpoint {}/{}: {}", i + 1, checkpoints.len(), checkpoint);
            match self.evaluate_checkpoint(checkpoint).await {
                Ok(report) => summary.push(report),
                Err(e) => {
                    error!(checkpoint = %checkpoint, "Evaluation aborted: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(summary)
    }

    /// One full cycle `Idle -> ... -> Reported -> Idle`.
    ///
    /// On error the orchestrator is back in `Idle` and, when sessions are
    /// reused, keeps the session so the next checkpoint can be evaluated.
    pub async fn evaluate_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<CheckpointReport> {
        let previous = match self.settings.session_reuse {
            SessionReuse::Reuse => self.session.take(),
            SessionReuse::Recreate => {
                self.session = None;
                None
            }
        };

        let request = LoadRequest {
            train_folder: &self.settings.train_folder,
            dataset_path: self.settings.dataset_path.as_deref(),
            checkpoint,
            device: self.settings.device,
        };
        let LoadedModel {
            mut policy,
            mut session,
        } = self.loader.load(&request, previous)?;

        let result = self
            .run_cycle(checkpoint, session.as_mut(), policy.as_mut())
            .await;

        if self.settings.session_reuse == SessionReuse::Reuse {
            self.session = Some(session);
        }
        if let Err(ref e) = result {
            self.abort_cycle(&e.to_string());
        }
        result
    }

    /// Return to `Idle` after a failed cycle, bypassing the transition table
    fn abort_cycle(&mut self, reason: &str) {
        if self.state == RolloutState::Idle {
            return;
        }
        warn!("Cycle aborted in state {}: {}", self.state, reason);
        self.transitions.push(StateTransition::new(
            self.state,
            RolloutState::Idle,
            format!("aborted: {}", reason),
        ));
        self.state = RolloutState::Idle;
    }

    async fn run_cycle(
        &mut self,
        checkpoint: &Checkpoint,
        session: &mut dyn EnvironmentSession,
        policy: &mut dyn Policy,
    ) -> Result<CheckpointReport> {
        let started_at = Utc::now();
        let epoch = extract_epoch(checkpoint);

        self.transition(RolloutState::EnvironmentReset, "checkpoint loaded")?;
        let episode = session.reset()?;
        debug!("Environment task: {}", episode.task_description);

        self.transition(RolloutState::Planning, "environment reset")?;
        let planned = self
            .gateway
            .select_plan(
                &episode.env_description,
                &self.settings.instruction,
                &episode.vocabulary,
            )
            .await;

        let mut report = CheckpointReport {
            checkpoint: checkpoint.to_string(),
            epoch,
            planner: self.gateway.kind().to_string(),
            instruction: self.settings.instruction.clone(),
            plan: Vec::new(),
            outcomes: Vec::new(),
            skipped: None,
            started_at,
            finished_at: started_at,
        };

        match planned {
            Err(e) => {
                warn!(checkpoint = %checkpoint, "Planning failed: {}", e);
                println!("\x1b[31mPlanning failed for {}: {}\x1b[0m", checkpoint, e);
                report.skipped = Some(SkipReason::PlanningFailed(e.to_string()));
            }
            Ok(plan) => {
                println!("\nChosen plan: \x1b[36m{}\x1b[0m", plan);
                report.plan = plan.actions().to_vec();

                if self.await_confirmation(checkpoint, &plan)? {
                    self.transition(RolloutState::Executing, "plan accepted")?;
                    let scene_info = session.scene_info();
                    if let Some(fixed) = scene_info.get("fixed_objects") {
                        info!("Fixed objects: {}", fixed);
                    }
                    report.outcomes = execute_plan(session, policy, &plan)?;
                } else {
                    report.skipped = Some(SkipReason::Declined);
                }
            }
        }

        self.transition(RolloutState::Reported, "checkpoint finished")?;
        report.finished_at = Utc::now();
        for sink in self.sinks.iter_mut() {
            sink.report(&report)?;
        }

        self.transition(RolloutState::Idle, "ready for next checkpoint")?;
        Ok(report)
    }

    fn await_confirmation(&mut self, checkpoint: &Checkpoint, plan: &ActionPlan) -> Result<bool> {
        let Some(mut confirmation) = self.confirmation.take() else {
            return Ok(true);
        };
        let answer = self
            .transition(RolloutState::AwaitingConfirmation, "plan ready")
            .and_then(|_| confirmation.confirm(checkpoint, plan));
        self.confirmation = Some(confirmation);
        answer
    }
}

/// Run every action of `plan` in order, whatever the outcome of the previous one.
///
/// A fault while executing an action is recorded as a failed action. A failure
/// to describe the scene afterwards is returned as an error.
pub fn execute_plan(
    session: &mut dyn EnvironmentSession,
    policy: &mut dyn Policy,
    plan: &ActionPlan,
) -> Result<Vec<RolloutOutcome>> {
    let mut outcomes = Vec::with_capacity(plan.len());
    for action in plan.iter() {
        let (success, fault) = match session.rollout(policy, action) {
            Ok(success) => (success, None),
            Err(e) => {
                warn!(action, "Action raised a fault: {}", e);
                (false, Some(e.to_string()))
            }
        };
        info!(action, success, checkpoint = %policy.checkpoint(), "Action finished");
        println!("{} successful? {}", action, success);

        let env_description = session.describe()?;
        println!("{}", env_description);
        println!("{}", "=".repeat(20));

        outcomes.push(RolloutOutcome {
            action: action.to_string(),
            success,
            env_description,
            fault,
        });
    }
    Ok(outcomes)
}
