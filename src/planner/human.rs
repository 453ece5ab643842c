//! Interactive planner: the operator assembles the plan at the console.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{PlanRequest, Planner, PlannerKind};
use crate::config::HumanPlannerConfig;
use crate::console::blocking_read;
use crate::domain::ActionVocabulary;
use crate::error::PlanningError;

/// Source of operator input lines. `None` means the operator gave up
/// (end of input or Ctrl-C).
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Pre-recorded input, for tests and scripted runs
#[derive(Debug, Default, Clone)]
pub struct ScriptedLines {
    lines: VecDeque<String>,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.lines.pop_front()
    }
}

impl LineSource for rustyline::DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        use rustyline::error::ReadlineError;

        match self.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.add_history_entry(trimmed);
                }
                Some(line)
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => None,
            Err(e) => {
                warn!("readline error: {}", e);
                None
            }
        }
    }
}

pub struct HumanPlanner {
    history_path: Option<PathBuf>,
}

impl HumanPlanner {
    pub fn new(config: &HumanPlannerConfig) -> Self {
        let history_path = if config.save_history {
            dirs::data_dir().map(|d| d.join("hulc-eval").join("planner_history.txt"))
        } else {
            None
        };
        Self { history_path }
    }

    fn run_editor(&self, vocabulary: &ActionVocabulary) -> Result<Vec<String>, PlanningError> {
        let mut rl = rustyline::DefaultEditor::new()
            .map_err(|e| PlanningError::Backend(format!("failed to open console: {}", e)))?;

        if let Some(ref path) = self.history_path {
            let _ = rl.load_history(path);
        }

        let plan = build_plan(&mut rl, vocabulary);

        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.save_history(path);
        }
        plan
    }
}

#[async_trait]
impl Planner for HumanPlanner {
    fn kind(&self) -> PlannerKind {
        PlannerKind::Human
    }

    async fn propose(&self, request: &PlanRequest<'_>) -> Result<Vec<String>, PlanningError> {
        println!();
        println!("Scene: {}", request.env_description.trim());
        println!("Instruction: {}", request.instruction.trim());
        blocking_read(|| self.run_editor(request.vocabulary))
    }
}

fn print_vocabulary(vocabulary: &ActionVocabulary) {
    println!("Available subtasks:");
    for (i, entry) in vocabulary.entries().iter().enumerate() {
        println!("  {:>2}. {:<28} {}", i + 1, entry.id, entry.description);
    }
    println!("Enter an id or number per line; 'undo' removes the last step, 'list' shows this menu, empty line or 'done' finishes.");
}

/// Read plan steps from `input` until the operator finishes.
///
/// Steps can be given as an action id or as the 1-based menu index.
/// Unknown entries are rejected and re-prompted.
pub fn build_plan(
    input: &mut dyn LineSource,
    vocabulary: &ActionVocabulary,
) -> Result<Vec<String>, PlanningError> {
    print_vocabulary(vocabulary);

    let mut plan: Vec<String> = Vec::new();
    loop {
        let prompt = format!("step {}> ", plan.len() + 1);
        let Some(line) = input.read_line(&prompt) else {
            return Err(PlanningError::Cancelled);
        };

        match line.trim() {
            "" | "done" => break,
            "undo" => match plan.pop() {
                Some(removed) => println!("removed {}", removed),
                None => println!("plan is empty"),
            },
            "list" | "?" => print_vocabulary(vocabulary),
            token => match resolve_step(token, vocabulary) {
                Some(id) => {
                    debug!("operator added {}", id);
                    plan.push(id);
                }
                None => println!("unknown subtask '{}'", token),
            },
        }
    }
    Ok(plan)
}

fn resolve_step(token: &str, vocabulary: &ActionVocabulary) -> Option<String> {
    if let Ok(index) = token.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| vocabulary.entries().get(i))
            .map(|e| e.id.clone());
    }
    vocabulary.contains(token).then(|| token.to_string())
}
