//! Simulation environment and policy loading
//!
//! The orchestration loop only talks to the simulator through
//! [`EnvironmentSession`] and obtains policies through
//! [`ModelEnvironmentLoader`]. A symbolic tabletop scene is bundled so the
//! evaluation runs without an external simulator.

mod loader;
mod tabletop;

use std::fmt;
use std::path::Path;

use crate::domain::{ActionVocabulary, Checkpoint};
use crate::error::Result;

pub use loader::TabletopLoader;
pub use tabletop::{
    tabletop_vocabulary, BlockColor, BlockLocation, SceneState, TabletopPolicy, TabletopSession,
};

/// What a fresh episode looks like right after reset
#[derive(Debug, Clone)]
pub struct EpisodeStart {
    /// Natural-language description of the scene
    pub env_description: String,
    /// Task the environment itself proposes for this episode
    pub task_description: String,
    /// Subtasks the policy can be asked to perform
    pub vocabulary: ActionVocabulary,
}

/// A trained policy restored from a checkpoint
pub trait Policy: Send {
    fn checkpoint(&self) -> &Checkpoint;

    /// Compute device the policy was loaded on
    fn device(&self) -> u32;
}

/// Live handle to a simulated scene
pub trait EnvironmentSession: Send {
    /// Start a new episode
    fn reset(&mut self) -> Result<EpisodeStart>;

    /// Describe the current scene in natural language
    fn describe(&self) -> Result<String>;

    /// Let the policy perform one subtask; `Ok(false)` means the subtask was not achieved
    fn rollout(&mut self, policy: &mut dyn Policy, action: &str) -> Result<bool>;

    /// Raw scene information for diagnostics
    fn scene_info(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Whether the environment session survives from one checkpoint to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionReuse {
    /// Keep one session for the whole run
    #[default]
    Reuse,
    /// Build a new session for every checkpoint
    Recreate,
}

impl SessionReuse {
    pub fn from_flag(reuse: bool) -> Self {
        if reuse {
            Self::Reuse
        } else {
            Self::Recreate
        }
    }
}

impl fmt::Display for SessionReuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionReuse::Reuse => write!(f, "reuse"),
            SessionReuse::Recreate => write!(f, "recreate"),
        }
    }
}

/// Inputs for restoring a policy
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub train_folder: &'a Path,
    pub dataset_path: Option<&'a Path>,
    pub checkpoint: &'a Checkpoint,
    pub device: u32,
}

/// A restored policy together with the session it will act in
pub struct LoadedModel {
    pub policy: Box<dyn Policy>,
    pub session: Box<dyn EnvironmentSession>,
}

/// Restores policies and provides environment sessions
pub trait ModelEnvironmentLoader {
    /// Load the policy for `request.checkpoint`.
    ///
    /// `session` is the previous session when it should be reused, `None`
    /// when a fresh one must be created.
    fn load(
        &mut self,
        request: &LoadRequest<'_>,
        session: Option<Box<dyn EnvironmentSession>>,
    ) -> Result<LoadedModel>;
}
