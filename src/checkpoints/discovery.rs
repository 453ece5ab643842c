//! Checkpoint discovery inside a training output directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::domain::Checkpoint;
use crate::error::{EvalError, Result};

/// Where checkpoints live below a training folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointLayout {
    /// Subdirectory holding checkpoint files (default: `saved_models`)
    pub subdir: String,
    /// Checkpoint file extension without the dot (default: `ckpt`)
    pub extension: String,
}

impl Default for CheckpointLayout {
    fn default() -> Self {
        Self {
            subdir: "saved_models".to_string(),
            extension: "ckpt".to_string(),
        }
    }
}

impl CheckpointLayout {
    /// Directory scanned for checkpoints; falls back to the training folder itself
    pub fn checkpoint_dir(&self, train_folder: &Path) -> PathBuf {
        let nested = train_folder.join(&self.subdir);
        if nested.is_dir() {
            nested
        } else {
            train_folder.to_path_buf()
        }
    }
}

/// List all checkpoints in training order (oldest first).
///
/// Checkpoints carrying an epoch marker are ordered by epoch. Unnumbered ones
/// such as `last.ckpt` come after them, by modification time then name.
/// A missing directory yields an empty list.
pub fn get_all_checkpoints(train_folder: &Path, layout: &CheckpointLayout) -> Result<Vec<Checkpoint>> {
    let dir = layout.checkpoint_dir(train_folder);
    if !dir.is_dir() {
        debug!("Checkpoint directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut found: Vec<(Checkpoint, Option<SystemTime>)> = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == layout.extension)
            .unwrap_or(false);
        if !matches_ext {
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).ok();
        found.push((Checkpoint::new(path), modified));
    }

    found.sort_by(|(a, a_time), (b, b_time)| {
        let a_epoch = a.epoch_index();
        let b_epoch = b.epoch_index();
        a_epoch
            .is_none()
            .cmp(&b_epoch.is_none())
            .then(a_epoch.cmp(&b_epoch))
            .then(a_time.cmp(b_time))
            .then(a.path().cmp(b.path()))
    });

    debug!("Found {} checkpoints in {:?}", found.len(), dir);
    Ok(found.into_iter().map(|(c, _)| c).collect())
}

/// Most recent checkpoint in training order
pub fn get_last_checkpoint(train_folder: &Path, layout: &CheckpointLayout) -> Result<Option<Checkpoint>> {
    Ok(get_all_checkpoints(train_folder, layout)?.pop())
}

/// Checkpoints for the requested epochs, in the order requested.
///
/// Epochs without a checkpoint are skipped with a warning.
pub fn get_checkpoints_for_epochs(
    train_folder: &Path,
    epochs: &[u64],
    layout: &CheckpointLayout,
) -> Result<Vec<Checkpoint>> {
    let all = get_all_checkpoints(train_folder, layout)?;
    let mut selected = Vec::new();

    for epoch in epochs {
        let before = selected.len();
        selected.extend(
            all.iter()
                .filter(|c| c.epoch_index() == Some(*epoch))
                .cloned(),
        );
        if selected.len() == before {
            warn!("No checkpoint found for epoch {}", epoch);
        }
    }

    Ok(selected)
}

/// Parse a comma separated epoch list such as `"3, 4,10"`
pub fn parse_epoch_list(raw: &str) -> Result<Vec<u64>> {
    let epochs = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| EvalError::Validation(format!("invalid epoch '{}' in '{}'", s, raw)))
        })
        .collect::<Result<Vec<_>>>()?;

    if epochs.is_empty() {
        return Err(EvalError::Validation(format!(
            "epoch list '{}' contains no epochs",
            raw
        )));
    }
    Ok(epochs)
}
