use tracing::{info, warn};

use super::{
    EnvironmentSession, LoadRequest, LoadedModel, ModelEnvironmentLoader, TabletopPolicy,
    TabletopSession,
};
use crate::error::{EvalError, Result};

/// Loads checkpoints into policies acting in the tabletop scene
#[derive(Debug, Default)]
pub struct TabletopLoader {
    sessions_created: u32,
}

impl TabletopLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions built so far
    pub fn sessions_created(&self) -> u32 {
        self.sessions_created
    }
}

impl ModelEnvironmentLoader for TabletopLoader {
    fn load(
        &mut self,
        request: &LoadRequest<'_>,
        session: Option<Box<dyn EnvironmentSession>>,
    ) -> Result<LoadedModel> {
        let checkpoint = request.checkpoint;
        if !checkpoint.path().is_file() {
            return Err(EvalError::NotFound(format!(
                "checkpoint file {} does not exist",
                checkpoint
            )));
        }

        if let Some(dataset) = request.dataset_path {
            if !dataset.exists() {
                warn!("Dataset path {:?} does not exist, using the built-in scene", dataset);
            }
        }

        let session = match session {
            Some(existing) => {
                info!("Reusing environment session for {}", checkpoint);
                existing
            }
            None => {
                self.sessions_created += 1;
                info!(
                    "Creating tabletop environment session #{} for {}",
                    self.sessions_created, checkpoint
                );
                Box::new(TabletopSession::new()) as Box<dyn EnvironmentSession>
            }
        };

        info!(
            "Loaded policy from {} on device {}",
            checkpoint, request.device
        );

        Ok(LoadedModel {
            policy: Box::new(TabletopPolicy::new(checkpoint.clone(), request.device)),
            session,
        })
    }
}
