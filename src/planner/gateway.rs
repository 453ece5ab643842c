use tracing::{debug, info, warn};

use super::{PlanRequest, Planner, PlannerKind};
use crate::domain::{ActionPlan, ActionVocabulary};
use crate::error::PlanningError;

/// Single entry point for obtaining a validated [`ActionPlan`]
pub struct PlannerGateway {
    planner: Box<dyn Planner>,
}

impl PlannerGateway {
    pub fn new(planner: Box<dyn Planner>) -> Self {
        Self { planner }
    }

    pub fn kind(&self) -> PlannerKind {
        self.planner.kind()
    }

    /// Ask the configured backend for a plan and validate it.
    ///
    /// The returned plan is non-empty and every action is in `vocabulary`.
    pub async fn select_plan(
        &self,
        env_description: &str,
        instruction: &str,
        vocabulary: &ActionVocabulary,
    ) -> Result<ActionPlan, PlanningError> {
        if vocabulary.is_empty() {
            return Err(PlanningError::Backend(
                "environment reported an empty action vocabulary".to_string(),
            ));
        }

        let request = PlanRequest {
            env_description,
            instruction,
            vocabulary,
        };

        info!(planner = %self.kind(), "Requesting plan for: {}", instruction);
        let proposal = self.planner.propose(&request).await.map_err(|e| {
            warn!(planner = %self.kind(), "Planner failed: {}", e);
            e
        })?;
        debug!(planner = %self.kind(), "Raw proposal: {:?}", proposal);

        let actions: Vec<String> = proposal
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let plan = ActionPlan::validated(actions, vocabulary)?;
        info!(planner = %self.kind(), steps = plan.len(), "Plan accepted: {}", plan);
        Ok(plan)
    }
}
