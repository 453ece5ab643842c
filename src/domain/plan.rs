use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PlanningError;

/// One executable subtask known to the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: String,
    pub description: String,
}

/// Ordered mapping from action identifiers to human-readable descriptions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionVocabulary {
    entries: Vec<VocabularyEntry>,
}

impl ActionVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, replacing the description if the id is already known
    pub fn insert(&mut self, id: impl Into<String>, description: impl Into<String>) {
        let id = id.into();
        let description = description.into();
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => entry.description = description,
            None => self.entries.push(VocabularyEntry { id, description }),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn description(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.description.as_str())
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&VocabularyEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `- id: description` lines for prompts and console listings
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {}: {}", e.id, e.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<I, D> FromIterator<(I, D)> for ActionVocabulary
where
    I: Into<String>,
    D: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, D)>>(iter: T) -> Self {
        let mut vocabulary = Self::new();
        for (id, description) in iter {
            vocabulary.insert(id, description);
        }
        vocabulary
    }
}

/// Ordered, non-empty sequence of vocabulary actions.
///
/// Only constructible through [`ActionPlan::validated`], so every plan in
/// circulation refers exclusively to known actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPlan {
    actions: Vec<String>,
}

impl ActionPlan {
    pub fn validated(
        actions: Vec<String>,
        vocabulary: &ActionVocabulary,
    ) -> Result<Self, PlanningError> {
        if actions.is_empty() {
            return Err(PlanningError::EmptyResponse);
        }
        if let Some(unknown) = actions.iter().find(|a| !vocabulary.contains(a)) {
            return Err(PlanningError::UnknownAction {
                action: unknown.clone(),
            });
        }
        Ok(Self { actions })
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Display for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.actions.join(", "))
    }
}

/// Result of executing a single plan action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutOutcome {
    pub action: String,
    pub success: bool,
    /// Environment description queried right after the action
    pub env_description: String,
    /// Simulation fault raised while executing, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}
