use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::checkpoints::CheckpointLayout;

/// Instruction evaluated when neither the CLI nor the config provides one
pub const DEFAULT_INSTRUCTION: &str =
    "turn off the led, pick the pink block and place it in the drawer, then turn off the lightbulb";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Natural-language task evaluated for every checkpoint
    #[serde(default = "default_instruction")]
    pub instruction: String,
    /// Ask the operator to confirm each plan before executing it
    #[serde(default = "default_true")]
    pub confirm_plan: bool,
    /// Keep one simulation session alive across checkpoints
    #[serde(default = "default_true")]
    pub reuse_session: bool,
    /// Subdirectory of the training folder holding checkpoints
    #[serde(default = "default_checkpoint_subdir")]
    pub checkpoint_subdir: String,
    /// Checkpoint file extension (without the dot)
    #[serde(default = "default_checkpoint_extension")]
    pub checkpoint_extension: String,
}

fn default_instruction() -> String {
    DEFAULT_INSTRUCTION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_checkpoint_subdir() -> String {
    "saved_models".to_string()
}

fn default_checkpoint_extension() -> String {
    "ckpt".to_string()
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            instruction: default_instruction(),
            confirm_plan: true,
            reuse_session: true,
            checkpoint_subdir: default_checkpoint_subdir(),
            checkpoint_extension: default_checkpoint_extension(),
        }
    }
}

impl EvaluationConfig {
    pub fn checkpoint_layout(&self) -> CheckpointLayout {
        CheckpointLayout {
            subdir: self.checkpoint_subdir.clone(),
            extension: self.checkpoint_extension.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "LlmEndpointConfig::openai")]
    pub openai: LlmEndpointConfig,
    #[serde(default = "LlmEndpointConfig::cohere")]
    pub cohere: LlmEndpointConfig,
    #[serde(default)]
    pub human: HumanPlannerConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            openai: LlmEndpointConfig::openai(),
            cohere: LlmEndpointConfig::cohere(),
            human: HumanPlannerConfig::default(),
        }
    }
}

/// Connection settings for a remote completion service
#[derive(Debug, Clone, Deserialize)]
pub struct LlmEndpointConfig {
    /// API base URL
    pub base_url: String,
    /// Model to use
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    512
}

impl LlmEndpointConfig {
    pub fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }

    pub fn cohere() -> Self {
        Self {
            base_url: "https://api.cohere.ai/v1".to_string(),
            model: "command-r".to_string(),
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HumanPlannerConfig {
    /// Persist prompt history under the user's data directory
    #[serde(default = "default_true")]
    pub save_history: bool,
}

impl Default for HumanPlannerConfig {
    fn default() -> Self {
        Self { save_history: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs in the log file
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            evaluation: EvaluationConfig::default(),
            planner: PlannerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/cluster.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HULC_EVAL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (HULC_EVAL__PLANNER__OPENAI__MODEL, etc.)
            .add_source(
                Environment::with_prefix("HULC_EVAL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.evaluation.instruction.trim().is_empty() {
            errors.push("evaluation.instruction must not be empty".to_string());
        }

        if self.evaluation.checkpoint_extension.trim().is_empty() {
            errors.push("evaluation.checkpoint_extension must not be empty".to_string());
        }

        for (name, endpoint) in [("openai", &self.planner.openai), ("cohere", &self.planner.cohere)] {
            if !endpoint.base_url.starts_with("http") {
                errors.push(format!("planner.{name}.base_url must be an http(s) URL"));
            }
            if endpoint.model.trim().is_empty() {
                errors.push(format!("planner.{name}.model must not be empty"));
            }
            if endpoint.timeout_secs == 0 {
                errors.push(format!("planner.{name}.timeout_secs must be positive"));
            }
            if !(0.0..=2.0).contains(&endpoint.temperature) {
                errors.push(format!("planner.{name}.temperature must be between 0 and 2"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
