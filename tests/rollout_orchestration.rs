use async_trait::async_trait;
use std::fs::{self, File};
use std::sync::{Arc, Mutex};

use hulc_eval::checkpoints::CheckpointResolver;
use hulc_eval::config::DEFAULT_INSTRUCTION;
use hulc_eval::domain::{ActionVocabulary, Checkpoint, RolloutState};
use hulc_eval::environment::{
    tabletop_vocabulary, EnvironmentSession, EpisodeStart, LoadRequest, LoadedModel,
    ModelEnvironmentLoader, Policy, SessionReuse, TabletopLoader, TabletopPolicy,
};
use hulc_eval::error::{EvalError, PlanningError, Result};
use hulc_eval::planner::{GroundTruthPlanner, PlanRequest, Planner, PlannerGateway, PlannerKind};
use hulc_eval::rollout::{
    AutoConfirm, CheckpointReport, PlanConfirmation, ReportSink, RolloutOrchestrator,
    RolloutSettings, SkipReason,
};

fn train_folder(epochs: &[u64]) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let models = tmp.path().join("saved_models");
    fs::create_dir(&models).unwrap();
    for epoch in epochs {
        File::create(models.join(format!("epoch={epoch}.ckpt"))).unwrap();
    }
    tmp
}

fn settings(root: &std::path::Path, reuse: SessionReuse) -> RolloutSettings {
    RolloutSettings {
        train_folder: root.to_path_buf(),
        dataset_path: None,
        device: 0,
        instruction: DEFAULT_INSTRUCTION.to_string(),
        session_reuse: reuse,
    }
}

/// Planner returning a fixed answer
struct FixedPlanner(std::result::Result<Vec<&'static str>, PlanningError>);

#[async_trait]
impl Planner for FixedPlanner {
    fn kind(&self) -> PlannerKind {
        PlannerKind::OpenAi
    }

    async fn propose(
        &self,
        _request: &PlanRequest<'_>,
    ) -> std::result::Result<Vec<String>, PlanningError> {
        self.0
            .clone()
            .map(|actions| actions.into_iter().map(str::to_string).collect())
    }
}

#[derive(Clone, Default)]
struct CollectingSink(Arc<Mutex<Vec<CheckpointReport>>>);

impl ReportSink for CollectingSink {
    fn report(&mut self, report: &CheckpointReport) -> Result<()> {
        self.0.lock().unwrap().push(report.clone());
        Ok(())
    }
}

struct Decline;

impl PlanConfirmation for Decline {
    fn confirm(&mut self, _checkpoint: &Checkpoint, _plan: &hulc_eval::ActionPlan) -> Result<bool> {
        Ok(false)
    }
}

/// Session where `b_step` fails and the description can be made to fail
struct StubSession {
    executed: Arc<Mutex<Vec<String>>>,
    broken_describe: bool,
}

impl EnvironmentSession for StubSession {
    fn reset(&mut self) -> Result<EpisodeStart> {
        let vocabulary: ActionVocabulary = [
            ("a_step", "first step"),
            ("b_step", "second step"),
            ("c_step", "third step"),
        ]
        .into_iter()
        .collect();
        Ok(EpisodeStart {
            env_description: "stub scene".to_string(),
            task_description: String::new(),
            vocabulary,
        })
    }

    fn describe(&self) -> Result<String> {
        if self.broken_describe {
            return Err(EvalError::EnvironmentFault("renderer crashed".to_string()));
        }
        Ok(format!("{} steps done", self.executed.lock().unwrap().len()))
    }

    fn rollout(&mut self, _policy: &mut dyn Policy, action: &str) -> Result<bool> {
        self.executed.lock().unwrap().push(action.to_string());
        Ok(action != "b_step")
    }
}

struct StubLoader {
    executed: Arc<Mutex<Vec<String>>>,
    broken_describe: bool,
}

impl ModelEnvironmentLoader for StubLoader {
    fn load(
        &mut self,
        request: &LoadRequest<'_>,
        session: Option<Box<dyn EnvironmentSession>>,
    ) -> Result<LoadedModel> {
        let session = session.unwrap_or_else(|| {
            Box::new(StubSession {
                executed: self.executed.clone(),
                broken_describe: self.broken_describe,
            }) as Box<dyn EnvironmentSession>
        });
        Ok(LoadedModel {
            policy: Box::new(TabletopPolicy::new(request.checkpoint.clone(), request.device)),
            session,
        })
    }
}

/// Counters shared between a `CountingLoader` and the sessions it creates
#[derive(Debug, Default)]
struct Counts {
    sessions_created: u32,
    resets: u32,
    scene_queries: u32,
    /// Number of upcoming resets that fail
    failing_resets: u32,
}

struct CountingSession(Arc<Mutex<Counts>>);

impl EnvironmentSession for CountingSession {
    fn reset(&mut self) -> Result<EpisodeStart> {
        let mut counts = self.0.lock().unwrap();
        counts.resets += 1;
        if counts.failing_resets > 0 {
            counts.failing_resets -= 1;
            return Err(EvalError::EnvironmentFault("transient".to_string()));
        }
        Ok(EpisodeStart {
            env_description: "counting scene".to_string(),
            task_description: String::new(),
            vocabulary: [("a_step", "first step")].into_iter().collect(),
        })
    }

    fn describe(&self) -> Result<String> {
        Ok("done".to_string())
    }

    fn rollout(&mut self, _policy: &mut dyn Policy, _action: &str) -> Result<bool> {
        Ok(true)
    }

    fn scene_info(&self) -> serde_json::Value {
        self.0.lock().unwrap().scene_queries += 1;
        serde_json::json!({ "fixed_objects": ["table"] })
    }
}

struct CountingLoader(Arc<Mutex<Counts>>);

impl ModelEnvironmentLoader for CountingLoader {
    fn load(
        &mut self,
        request: &LoadRequest<'_>,
        session: Option<Box<dyn EnvironmentSession>>,
    ) -> Result<LoadedModel> {
        let session = match session {
            Some(session) => session,
            None => {
                self.0.lock().unwrap().sessions_created += 1;
                Box::new(CountingSession(self.0.clone())) as Box<dyn EnvironmentSession>
            }
        };
        Ok(LoadedModel {
            policy: Box::new(TabletopPolicy::new(request.checkpoint.clone(), request.device)),
            session,
        })
    }
}

fn counting_orchestrator(counts: &Arc<Mutex<Counts>>, reuse: SessionReuse) -> RolloutOrchestrator {
    RolloutOrchestrator::new(
        settings(std::path::Path::new("."), reuse),
        Box::new(CountingLoader(counts.clone())),
        PlannerGateway::new(Box::new(FixedPlanner(Ok(vec!["a_step"])))),
    )
}

fn three_checkpoints() -> Vec<Checkpoint> {
    (1..=3)
        .map(|epoch| Checkpoint::new(format!("epoch={epoch}.ckpt")))
        .collect()
}

#[tokio::test]
async fn reused_session_is_created_once_and_reset_per_checkpoint() {
    let counts = Arc::new(Mutex::new(Counts::default()));
    let mut orchestrator = counting_orchestrator(&counts, SessionReuse::Reuse);

    let summary = orchestrator.run(&three_checkpoints()).await.unwrap();

    assert_eq!(summary.len(), 3);
    let counts = counts.lock().unwrap();
    assert_eq!(counts.sessions_created, 1);
    assert_eq!(counts.resets, 3);
}

#[tokio::test]
async fn recreated_session_is_built_for_every_checkpoint() {
    let counts = Arc::new(Mutex::new(Counts::default()));
    let mut orchestrator = counting_orchestrator(&counts, SessionReuse::Recreate);

    let summary = orchestrator.run(&three_checkpoints()).await.unwrap();

    assert_eq!(summary.len(), 3);
    let counts = counts.lock().unwrap();
    assert_eq!(counts.sessions_created, 3);
    assert_eq!(counts.resets, 3);
}

#[tokio::test]
async fn failed_reset_returns_to_idle_and_keeps_the_session() {
    let counts = Arc::new(Mutex::new(Counts {
        failing_resets: 1,
        ..Counts::default()
    }));
    let mut orchestrator = counting_orchestrator(&counts, SessionReuse::Reuse);

    let err = orchestrator
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::EnvironmentFault(_)));
    assert_eq!(orchestrator.state(), RolloutState::Idle);
    assert!(orchestrator
        .transitions()
        .last()
        .is_some_and(|t| t.from == RolloutState::EnvironmentReset && t.to == RolloutState::Idle));

    let report = orchestrator
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap();
    assert!(report.is_success());
    assert_eq!(orchestrator.state(), RolloutState::Idle);
    assert_eq!(counts.lock().unwrap().sessions_created, 1);
}

#[tokio::test]
async fn fixed_objects_are_only_queried_for_accepted_plans() {
    let counts = Arc::new(Mutex::new(Counts::default()));
    let mut declining =
        counting_orchestrator(&counts, SessionReuse::Reuse).with_confirmation(Box::new(Decline));
    declining
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap();
    assert_eq!(counts.lock().unwrap().scene_queries, 0);

    let mut accepting =
        counting_orchestrator(&counts, SessionReuse::Reuse).with_confirmation(Box::new(AutoConfirm));
    accepting
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap();
    assert_eq!(counts.lock().unwrap().scene_queries, 1);
    let states: Vec<RolloutState> = accepting.transitions().iter().map(|t| t.to).collect();
    assert_eq!(
        states,
        vec![
            RolloutState::EnvironmentReset,
            RolloutState::Planning,
            RolloutState::AwaitingConfirmation,
            RolloutState::Executing,
            RolloutState::Reported,
            RolloutState::Idle,
        ]
    );
}

#[tokio::test]
async fn failing_action_does_not_stop_the_plan() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let sink = CollectingSink::default();
    let loader = StubLoader {
        executed: executed.clone(),
        broken_describe: false,
    };
    let gateway = PlannerGateway::new(Box::new(FixedPlanner(Ok(vec!["a_step", "b_step", "c_step"]))));
    let mut orchestrator =
        RolloutOrchestrator::new(settings(std::path::Path::new("."), SessionReuse::Reuse), Box::new(loader), gateway)
            .with_sink(Box::new(sink.clone()));

    let report = orchestrator
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap();

    assert_eq!(*executed.lock().unwrap(), vec!["a_step", "b_step", "c_step"]);
    let results: Vec<(String, bool)> = report
        .outcomes
        .iter()
        .map(|o| (o.action.clone(), o.success))
        .collect();
    assert_eq!(
        results,
        vec![
            ("a_step".to_string(), true),
            ("b_step".to_string(), false),
            ("c_step".to_string(), true),
        ]
    );
    assert_eq!(report.outcomes[1].env_description, "2 steps done");
    assert_eq!(sink.0.lock().unwrap().len(), 1);
    assert_eq!(orchestrator.state(), RolloutState::Idle);
}

#[tokio::test]
async fn planning_failure_is_reported_and_the_run_continues() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let loader = StubLoader {
        executed: executed.clone(),
        broken_describe: false,
    };
    let gateway = PlannerGateway::new(Box::new(FixedPlanner(Err(PlanningError::Unreachable(
        "connection refused".to_string(),
    )))));
    let mut orchestrator =
        RolloutOrchestrator::new(settings(std::path::Path::new("."), SessionReuse::Reuse), Box::new(loader), gateway);

    let checkpoints = vec![Checkpoint::new("epoch=1.ckpt"), Checkpoint::new("epoch=2.ckpt")];
    let summary = orchestrator.run(&checkpoints).await.unwrap();

    assert_eq!(summary.len(), 2);
    for report in &summary.reports {
        assert!(report.outcomes.is_empty());
        assert!(matches!(report.skipped, Some(SkipReason::PlanningFailed(_))));
    }
    assert!(executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_action_from_planner_is_a_planning_failure() {
    let loader = StubLoader {
        executed: Arc::new(Mutex::new(Vec::new())),
        broken_describe: false,
    };
    let gateway = PlannerGateway::new(Box::new(FixedPlanner(Ok(vec!["a_step", "fly_away"]))));
    let mut orchestrator =
        RolloutOrchestrator::new(settings(std::path::Path::new("."), SessionReuse::Reuse), Box::new(loader), gateway);

    let report = orchestrator
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap();

    assert!(report.plan.is_empty());
    assert!(matches!(report.skipped, Some(SkipReason::PlanningFailed(ref m)) if m.contains("fly_away")));
}

#[tokio::test]
async fn declined_plan_is_not_executed() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let loader = StubLoader {
        executed: executed.clone(),
        broken_describe: false,
    };
    let gateway = PlannerGateway::new(Box::new(FixedPlanner(Ok(vec!["a_step"]))));
    let mut orchestrator =
        RolloutOrchestrator::new(settings(std::path::Path::new("."), SessionReuse::Reuse), Box::new(loader), gateway)
            .with_confirmation(Box::new(Decline));

    let report = orchestrator
        .evaluate_checkpoint(&Checkpoint::new("epoch=1.ckpt"))
        .await
        .unwrap();

    assert_eq!(report.plan, vec!["a_step"]);
    assert_eq!(report.skipped, Some(SkipReason::Declined));
    assert!(executed.lock().unwrap().is_empty());
    assert!(orchestrator
        .transitions()
        .iter()
        .any(|t| t.to == RolloutState::AwaitingConfirmation));
}

#[tokio::test]
async fn describe_failure_aborts_the_run() {
    let loader = StubLoader {
        executed: Arc::new(Mutex::new(Vec::new())),
        broken_describe: true,
    };
    let gateway = PlannerGateway::new(Box::new(FixedPlanner(Ok(vec!["a_step"]))));
    let mut orchestrator =
        RolloutOrchestrator::new(settings(std::path::Path::new("."), SessionReuse::Reuse), Box::new(loader), gateway);

    let err = orchestrator
        .run(&[Checkpoint::new("epoch=1.ckpt"), Checkpoint::new("epoch=2.ckpt")])
        .await
        .unwrap_err();

    assert!(matches!(err, EvalError::EnvironmentFault(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn ground_truth_run_on_tabletop_completes_default_task() {
    let tmp = train_folder(&[1, 2, 5]);
    let checkpoints = CheckpointResolver::new(tmp.path())
        .resolve_inputs(None, None, Some(2))
        .unwrap();

    let sink = CollectingSink::default();
    let mut orchestrator = RolloutOrchestrator::new(
        settings(tmp.path(), SessionReuse::Reuse),
        Box::new(TabletopLoader::new()),
        PlannerGateway::new(Box::new(GroundTruthPlanner::new())),
    )
    .with_sink(Box::new(sink.clone()));

    let summary = orchestrator.run(&checkpoints).await.unwrap();

    assert_eq!(summary.len(), 2);
    assert_eq!(summary.successful_checkpoints(), 2);
    let reports = sink.0.lock().unwrap();
    assert_eq!(
        reports[0].plan,
        vec!["turn_off_led", "lift_pink_block", "place_in_drawer", "turn_off_lightbulb"]
    );
    assert_eq!(reports[0].plan, reports[1].plan);
    assert_eq!(reports[0].planner, "truth");
    assert_eq!(reports[1].epoch, "0");
}

#[tokio::test]
async fn ground_truth_plan_is_identical_across_runs() {
    let vocabulary = tabletop_vocabulary();
    let gateway = PlannerGateway::new(Box::new(GroundTruthPlanner::new()));

    let first = gateway
        .select_plan("The led is on.", DEFAULT_INSTRUCTION, &vocabulary)
        .await
        .unwrap();
    for _ in 0..5 {
        let again = gateway
            .select_plan("The led is on.", DEFAULT_INSTRUCTION, &vocabulary)
            .await
            .unwrap();
        assert_eq!(again, first);
    }
}
