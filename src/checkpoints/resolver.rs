use std::fmt;
use std::path::{Path, PathBuf};

use tracing::info;

use super::discovery::{
    get_all_checkpoints, get_checkpoints_for_epochs, get_last_checkpoint, parse_epoch_list,
    CheckpointLayout,
};
use crate::domain::Checkpoint;
use crate::error::{EvalError, Result};

/// Which checkpoints to evaluate. Exactly one mode is active per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSelection {
    /// A single checkpoint given directly
    ExplicitPath(PathBuf),
    /// Checkpoints for these epochs, in this order
    EpochList(Vec<u64>),
    /// The K most recent checkpoints, oldest first
    LastK(usize),
    /// The most recent checkpoint
    Latest,
}

impl CheckpointSelection {
    /// Pick the selection mode from raw inputs.
    ///
    /// Precedence: explicit path > epoch list > last-k > latest. Several inputs
    /// at once are not an error; the lower-precedence ones are ignored.
    pub fn from_inputs(
        explicit: Option<&Path>,
        epoch_list: Option<&str>,
        last_k: Option<usize>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::ExplicitPath(path.to_path_buf()));
        }
        if let Some(raw) = epoch_list {
            return Ok(Self::EpochList(parse_epoch_list(raw)?));
        }
        if let Some(k) = last_k {
            if k == 0 {
                return Err(EvalError::Validation(
                    "last_k_checkpoints must be at least 1".to_string(),
                ));
            }
            return Ok(Self::LastK(k));
        }
        Ok(Self::Latest)
    }
}

impl fmt::Display for CheckpointSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitPath(path) => write!(f, "checkpoint {}", path.display()),
            Self::EpochList(epochs) => {
                let epochs: Vec<String> = epochs.iter().map(u64::to_string).collect();
                write!(f, "checkpoints {}", epochs.join(","))
            }
            Self::LastK(k) => write!(f, "last {} checkpoints", k),
            Self::Latest => write!(f, "last checkpoint"),
        }
    }
}

/// Turns a selection into the ordered list of checkpoints to evaluate
#[derive(Debug, Clone)]
pub struct CheckpointResolver {
    train_folder: PathBuf,
    layout: CheckpointLayout,
}

impl CheckpointResolver {
    pub fn new(train_folder: impl Into<PathBuf>) -> Self {
        Self::with_layout(train_folder, CheckpointLayout::default())
    }

    pub fn with_layout(train_folder: impl Into<PathBuf>, layout: CheckpointLayout) -> Self {
        Self {
            train_folder: train_folder.into(),
            layout,
        }
    }

    /// Resolve a selection. Never returns an empty list.
    pub fn resolve(&self, selection: &CheckpointSelection) -> Result<Vec<Checkpoint>> {
        info!("Evaluating model with {}.", selection);

        let checkpoints = match selection {
            CheckpointSelection::ExplicitPath(path) => vec![Checkpoint::new(path.clone())],
            CheckpointSelection::EpochList(epochs) => {
                get_checkpoints_for_epochs(&self.train_folder, epochs, &self.layout)?
            }
            CheckpointSelection::LastK(k) => {
                let mut all = get_all_checkpoints(&self.train_folder, &self.layout)?;
                let start = all.len().saturating_sub(*k);
                all.split_off(start)
            }
            CheckpointSelection::Latest => get_last_checkpoint(&self.train_folder, &self.layout)?
                .into_iter()
                .collect(),
        };

        if checkpoints.is_empty() {
            return Err(EvalError::NotFound(format!(
                "{} under {}",
                selection,
                self.train_folder.display()
            )));
        }
        Ok(checkpoints)
    }

    /// Shorthand for [`CheckpointSelection::from_inputs`] followed by [`Self::resolve`]
    pub fn resolve_inputs(
        &self,
        explicit: Option<&Path>,
        epoch_list: Option<&str>,
        last_k: Option<usize>,
    ) -> Result<Vec<Checkpoint>> {
        let selection = CheckpointSelection::from_inputs(explicit, epoch_list, last_k)?;
        self.resolve(&selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    fn train_folder(epochs: &[u64]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let models = tmp.path().join("saved_models");
        fs::create_dir(&models).unwrap();
        for epoch in epochs {
            File::create(models.join(format!("epoch={}.ckpt", epoch))).unwrap();
        }
        tmp
    }

    fn epochs(checkpoints: &[Checkpoint]) -> Vec<Option<u64>> {
        checkpoints.iter().map(Checkpoint::epoch_index).collect()
    }

    #[test]
    fn test_selection_precedence() {
        let path = Path::new("/path/to/ckpt.pt");
        assert_eq!(
            CheckpointSelection::from_inputs(Some(path), Some("3,4"), Some(2)).unwrap(),
            CheckpointSelection::ExplicitPath(path.to_path_buf())
        );
        assert_eq!(
            CheckpointSelection::from_inputs(None, Some("3,4"), Some(2)).unwrap(),
            CheckpointSelection::EpochList(vec![3, 4])
        );
        assert_eq!(
            CheckpointSelection::from_inputs(None, None, Some(2)).unwrap(),
            CheckpointSelection::LastK(2)
        );
        assert_eq!(
            CheckpointSelection::from_inputs(None, None, None).unwrap(),
            CheckpointSelection::Latest
        );
    }

    #[test]
    fn test_last_k_zero_is_rejected() {
        assert!(CheckpointSelection::from_inputs(None, None, Some(0)).is_err());
    }

    #[test]
    fn test_latest_picks_newest_epoch() {
        let tmp = train_folder(&[1, 2, 5]);
        let resolved = CheckpointResolver::new(tmp.path())
            .resolve(&CheckpointSelection::Latest)
            .unwrap();
        assert_eq!(epochs(&resolved), vec![Some(5)]);
    }

    #[test]
    fn test_last_k_larger_than_available() {
        let tmp = train_folder(&[1, 2]);
        let resolved = CheckpointResolver::new(tmp.path())
            .resolve(&CheckpointSelection::LastK(10))
            .unwrap();
        assert_eq!(epochs(&resolved), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_empty_folder_is_not_found() {
        let tmp = train_folder(&[]);
        let err = CheckpointResolver::new(tmp.path())
            .resolve(&CheckpointSelection::Latest)
            .unwrap_err();
        assert!(matches!(err, EvalError::NotFound(_)));
    }

    #[test]
    fn test_explicit_path_ignores_empty_folder() {
        let tmp = train_folder(&[]);
        let resolved = CheckpointResolver::new(tmp.path())
            .resolve_inputs(Some(Path::new("/elsewhere/epoch=9.ckpt")), None, None)
            .unwrap();
        assert_eq!(resolved, vec![Checkpoint::new("/elsewhere/epoch=9.ckpt")]);
    }

    #[test]
    fn test_unmatched_epoch_list_is_not_found() {
        let tmp = train_folder(&[1, 2]);
        let err = CheckpointResolver::new(tmp.path())
            .resolve_inputs(None, Some("7,8"), None)
            .unwrap_err();
        assert!(matches!(err, EvalError::NotFound(_)));
    }
}
