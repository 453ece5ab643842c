//! API key loading for remote planner backends

use std::fs;
use std::path::Path;

use tracing::{info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;

/// API key for a remote planner backend
///
/// # Security
/// The key is wiped from memory when dropped and never printed by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read the key from an environment variable, ignoring blank values
    pub fn from_env(var: &str) -> Option<Self> {
        let mut raw = std::env::var(var).ok()?;
        let key = raw.trim().to_string();
        raw.zeroize();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Raw key for request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Load a credential from a file holding a single key.
///
/// The whole file content, trimmed of surrounding whitespace, is the key.
/// No path means no credential. An empty file is treated the same way, with
/// a warning.
pub fn load_credential(path: Option<&Path>) -> Result<Option<ApiKey>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let mut raw = fs::read_to_string(path)?;
    let key = raw.trim().to_string();
    raw.zeroize();

    if key.is_empty() {
        warn!("Credential file {:?} is empty, continuing without an API key", path);
        return Ok(None);
    }

    info!("Loaded API key from {:?}", path);
    Ok(Some(ApiKey(key)))
}
