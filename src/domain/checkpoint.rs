use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A saved policy state, identified by its path on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without extension, e.g. `epoch=12` for `saved_models/epoch=12.ckpt`
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Training epoch encoded in the file stem, if any.
    ///
    /// Understands `epoch=12`, `epoch=12-step=3400` and bare `key=12` stems.
    /// Used for ordering and epoch-list matching only; display labels come from
    /// [`crate::checkpoints::extract_epoch`].
    pub fn epoch_index(&self) -> Option<u64> {
        let stem = self.stem();
        let value = match stem.find("epoch=") {
            Some(pos) => &stem[pos + "epoch=".len()..],
            None => stem.split_once('=')?.1,
        };
        let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for Checkpoint {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}
