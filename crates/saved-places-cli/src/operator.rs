//! Terminal prompt that hands control to the person at the keyboard.

use async_trait::async_trait;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use saved_places::{Feature, ImportError, ImportResult, Operator};

const CONTINUE_PROMPT: &str = "Press Enter to continue...";

/// Waits for Enter after each place is shown, so the user can save it by
/// hand (pick a list, add a note) before the run moves on.
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl TerminalOperator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    async fn confirm(&mut self, feature: &Feature) -> ImportResult<()> {
        tracing::debug!("waiting for operator on {feature}");
        let line = tokio::task::spawn_blocking(|| {
            let mut editor = DefaultEditor::new()?;
            editor.readline(CONTINUE_PROMPT)
        })
        .await
        .map_err(|e| ImportError::Operator(format!("prompt task failed: {e}")))?;

        match line {
            Ok(_) => Ok(()),
            Err(ReadlineError::Interrupted) => Err(ImportError::Operator("interrupted".into())),
            Err(ReadlineError::Eof) => Err(ImportError::Operator("input closed".into())),
            Err(e) => Err(ImportError::Operator(e.to_string())),
        }
    }
}
