use tracing::info;

use super::{
    CohereBackend, GroundTruthPlanner, HumanPlanner, LlmPlanner, OpenAiBackend, Planner,
    PlannerKind,
};
use crate::config::PlannerConfig;
use crate::credentials::ApiKey;
use crate::error::PlanningError;

const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
const COHERE_KEY_ENV: &str = "COHERE_API_KEY";

/// Build the planner backend selected on the command line.
///
/// `credential` is the key read from the credential file, if any. Remote
/// backends fall back to their usual environment variable and fail with
/// [`PlanningError::MissingCredential`] when neither is available.
pub fn build_planner(
    kind: PlannerKind,
    config: &PlannerConfig,
    credential: Option<ApiKey>,
) -> Result<Box<dyn Planner>, PlanningError> {
    let planner: Box<dyn Planner> = match kind {
        PlannerKind::GroundTruth => Box::new(GroundTruthPlanner::new()),
        PlannerKind::Human => Box::new(HumanPlanner::new(&config.human)),
        PlannerKind::OpenAi => {
            let key = resolve_key(kind, credential, OPENAI_KEY_ENV)?;
            let backend = OpenAiBackend::new(config.openai.clone(), key)?;
            info!(model = %config.openai.model, "Using OpenAI planner at {}", config.openai.base_url);
            Box::new(LlmPlanner::new(kind, backend))
        }
        PlannerKind::Cohere => {
            let key = resolve_key(kind, credential, COHERE_KEY_ENV)?;
            let backend = CohereBackend::new(config.cohere.clone(), key)?;
            info!(model = %config.cohere.model, "Using Cohere planner at {}", config.cohere.base_url);
            Box::new(LlmPlanner::new(kind, backend))
        }
    };
    Ok(planner)
}

fn resolve_key(
    kind: PlannerKind,
    credential: Option<ApiKey>,
    env_var: &str,
) -> Result<ApiKey, PlanningError> {
    credential
        .or_else(|| ApiKey::from_env(env_var))
        .ok_or_else(|| PlanningError::MissingCredential {
            planner: kind.to_string(),
        })
}
