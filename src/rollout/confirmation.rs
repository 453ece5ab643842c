use tracing::{info, warn};

use crate::console::blocking_read;
use crate::domain::{ActionPlan, Checkpoint};
use crate::error::{EvalError, Result};

/// Operator go-ahead between planning and execution
pub trait PlanConfirmation {
    /// `Ok(true)` to execute the plan, `Ok(false)` to skip it
    fn confirm(&mut self, checkpoint: &Checkpoint, plan: &ActionPlan) -> Result<bool>;
}

/// Accept every plan (`--yes`, non-interactive runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl PlanConfirmation for AutoConfirm {
    fn confirm(&mut self, _checkpoint: &Checkpoint, _plan: &ActionPlan) -> Result<bool> {
        Ok(true)
    }
}

/// Pause on the console until the operator presses Enter.
///
/// Typing `n`, `no` or `skip` declines the plan, as does end of input.
pub struct ConsoleConfirmation {
    editor: rustyline::DefaultEditor,
}

impl ConsoleConfirmation {
    pub fn new() -> Result<Self> {
        let editor = rustyline::DefaultEditor::new()
            .map_err(|e| EvalError::Internal(format!("failed to open console: {}", e)))?;
        Ok(Self { editor })
    }
}

impl PlanConfirmation for ConsoleConfirmation {
    fn confirm(&mut self, checkpoint: &Checkpoint, plan: &ActionPlan) -> Result<bool> {
        use rustyline::error::ReadlineError;

        let editor = &mut self.editor;
        match blocking_read(|| editor.readline("Press [Enter] to continue...")) {
            Ok(line) => {
                let accepted = is_acceptance(&line);
                if !accepted {
                    info!("Operator skipped plan {} for {}", plan, checkpoint);
                }
                Ok(accepted)
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                warn!("No operator input, skipping plan for {}", checkpoint);
                Ok(false)
            }
            Err(e) => Err(EvalError::Internal(format!("readline error: {}", e))),
        }
    }
}

fn is_acceptance(line: &str) -> bool {
    !matches!(line.trim().to_ascii_lowercase().as_str(), "n" | "no" | "skip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionVocabulary;

    #[test]
    fn test_acceptance_answers() {
        assert!(is_acceptance(""));
        assert!(is_acceptance("y"));
        assert!(is_acceptance("go"));
        assert!(!is_acceptance("n"));
        assert!(!is_acceptance(" NO "));
        assert!(!is_acceptance("skip"));
    }

    #[test]
    fn test_auto_confirm_accepts() {
        let vocabulary: ActionVocabulary = [("open_drawer", "open the drawer")].into_iter().collect();
        let plan = ActionPlan::validated(vec!["open_drawer".to_string()], &vocabulary).unwrap();
        let checkpoint = Checkpoint::new("epoch=1.ckpt");
        assert!(AutoConfirm.confirm(&checkpoint, &plan).unwrap());
    }
}
