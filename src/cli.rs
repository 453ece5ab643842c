use clap::Parser;
use std::path::PathBuf;

use crate::checkpoints::CheckpointSelection;
use crate::config::AppConfig;
use crate::environment::SessionReuse;
use crate::error::Result;
use crate::planner::PlannerKind;

#[derive(Parser, Debug)]
#[command(name = "hulc-eval")]
#[command(version = "0.1.0")]
#[command(
    about = "Evaluate trained policy checkpoints on planner-generated subtask plans",
    long_about = None
)]
pub struct Cli {
    /// Dataset the policy was trained on
    #[arg(long = "dataset_path")]
    pub dataset_path: Option<PathBuf>,

    /// Training output folder to search for checkpoints
    #[arg(long = "train_folder")]
    pub train_folder: PathBuf,

    /// Comma separated epochs to evaluate, e.g. "3,4,10"
    #[arg(long = "checkpoints")]
    pub checkpoints: Option<String>,

    /// Evaluate this checkpoint file only
    #[arg(long = "checkpoint")]
    pub checkpoint: Option<PathBuf>,

    /// Evaluate the K most recent checkpoints
    #[arg(long = "last_k_checkpoints")]
    pub last_k_checkpoints: Option<usize>,

    /// Print debug information
    #[arg(long)]
    pub debug: bool,

    /// Where to write logs and rollout records
    #[arg(long = "eval_log_dir")]
    pub eval_log_dir: Option<PathBuf>,

    /// CUDA device
    #[arg(long, default_value_t = 0)]
    pub device: u32,

    /// Planner backend: truth, user, cohere or openai
    #[arg(long, default_value = "openai")]
    pub planner: PlannerKind,

    /// File holding the planner API key
    #[arg(long = "cohere-path")]
    pub cohere_path: Option<PathBuf>,

    /// Task instruction (overrides evaluation.instruction)
    #[arg(long)]
    pub instruction: Option<String>,

    /// Execute plans without waiting for Enter
    #[arg(short, long)]
    pub yes: bool,

    /// Build a new environment for every checkpoint
    #[arg(long = "recreate-env")]
    pub recreate_env: bool,

    /// Config directory
    #[arg(long, default_value = "config")]
    pub config: PathBuf,
}

impl Cli {
    pub fn selection(&self) -> Result<CheckpointSelection> {
        CheckpointSelection::from_inputs(
            self.checkpoint.as_deref(),
            self.checkpoints.as_deref(),
            self.last_k_checkpoints,
        )
    }

    pub fn instruction(&self, config: &AppConfig) -> String {
        self.instruction
            .clone()
            .unwrap_or_else(|| config.evaluation.instruction.clone())
    }

    pub fn session_reuse(&self, config: &AppConfig) -> SessionReuse {
        if self.recreate_env {
            SessionReuse::Recreate
        } else {
            SessionReuse::from_flag(config.evaluation.reuse_session)
        }
    }

    pub fn confirm_plans(&self, config: &AppConfig) -> bool {
        !self.yes && config.evaluation.confirm_plan
    }
}
