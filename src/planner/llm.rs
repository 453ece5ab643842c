//! Shared plumbing for planners backed by a remote completion service.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{PlanRequest, Planner, PlannerKind};
use crate::error::PlanningError;

/// System prompt for plan generation
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are the task planner of a robot arm working at a desk.

You receive a description of the scene, a task instruction and the list of
subtasks the robot can execute. Decompose the instruction into the ordered
sequence of subtasks that accomplishes it.

Rules:
1. Only use subtask identifiers from the provided list, spelled exactly.
2. Order matters: the robot executes the subtasks one after another.
3. Do not add subtasks the instruction does not require.

Respond ONLY with a JSON array of subtask identifiers, e.g. ["open_drawer", "lift_red_block"]."#;

/// A remote chat/completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send one system + user exchange and return the raw reply text
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, PlanningError>;
}

/// Planner that delegates to a [`CompletionBackend`]
pub struct LlmPlanner<B> {
    kind: PlannerKind,
    backend: B,
}

impl<B: CompletionBackend> LlmPlanner<B> {
    pub fn new(kind: PlannerKind, backend: B) -> Self {
        Self { kind, backend }
    }
}

#[async_trait]
impl<B: CompletionBackend> Planner for LlmPlanner<B> {
    fn kind(&self) -> PlannerKind {
        self.kind
    }

    async fn propose(&self, request: &PlanRequest<'_>) -> Result<Vec<String>, PlanningError> {
        let prompt = build_prompt(request);
        debug!(planner = %self.kind, "Prompt:\n{}", prompt);

        let reply = self.backend.complete(PLANNER_SYSTEM_PROMPT, &prompt).await?;
        debug!(planner = %self.kind, "Raw reply: {}", reply);

        parse_plan_response(&reply)
    }
}

fn build_prompt(request: &PlanRequest<'_>) -> String {
    format!(
        r#"## Scene

{}

## Available subtasks

{}

## Instruction

{}

Respond ONLY with a JSON array of subtask identifiers."#,
        request.env_description.trim(),
        request.vocabulary.render(),
        request.instruction.trim()
    )
}

/// Parse a model reply into action ids.
///
/// Accepts a JSON array, a JSON object with a `plan` or `actions` array, either
/// optionally inside a code fence, or a numbered/bulleted list.
pub fn parse_plan_response(text: &str) -> Result<Vec<String>, PlanningError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PlanningError::EmptyResponse);
    }

    if let Some(actions) = first_json_plan(text) {
        return Ok(actions);
    }

    let actions: Vec<String> = text.lines().filter_map(action_from_line).collect();
    if actions.is_empty() {
        return Err(PlanningError::Unparseable(truncate(text, 200)));
    }
    Ok(actions)
}

fn actions_from_json(value: &Value) -> Option<Vec<String>> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("plan")
            .or_else(|| map.get("actions"))
            .and_then(Value::as_array)?,
        _ => return None,
    };
    array
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// First complete JSON value in `text` that holds a plan.
///
/// Each `[` or `{` is tried as the start of a value; the streaming
/// deserializer stops at the end of that value, so text after it
/// (closing code fences, trailing prose) is ignored.
fn first_json_plan(text: &str) -> Option<Vec<String>> {
    text.char_indices()
        .filter(|(_, c)| matches!(c, '[' | '{'))
        .find_map(|(start, _)| {
            let value = serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<Value>()
                .next()?
                .ok()?;
            actions_from_json(&value)
        })
}

/// `"2. open_drawer"`, `"- `lift_red_block`"` -> action id
fn action_from_line(line: &str) -> Option<String> {
    let trimmed = line
        .trim()
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_ascii_digit())
        .trim_start_matches(['.', ')'])
        .trim();
    let token = trimmed
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | ',' | '.' | ':' | ';'));

    let looks_like_id = !token.is_empty()
        && token.contains('_')
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    looks_like_id.then(|| token.to_string())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}
