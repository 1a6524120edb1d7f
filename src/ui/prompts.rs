//! ui::prompts
//!
//! Yes/no questions on the terminal.
//!
//! Without a terminal a prompt fails with [`PromptError::NotInteractive`] and
//! the caller decides what silence means. Advisory questions treat it as
//! consent; anything that would touch uncommitted work treats it as refusal.
//!
//! The engine asks through the [`Prompter`] trait so tests can script
//! answers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("not in interactive mode")]
    NotInteractive,

    #[error("cannot read answer: {0}")]
    IoError(String),
}

/// Something that can ask the user a yes/no question.
pub trait Prompter {
    /// Ask `message`, offering `default`.
    ///
    /// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;
}

/// Prompts on the controlling terminal using dialoguer.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Create a prompter; `interactive == false` makes every prompt fail with
    /// [`PromptError::NotInteractive`].
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        if !self.interactive {
            return Err(PromptError::NotInteractive);
        }
        dialoguer::Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| PromptError::IoError(e.to_string()))
    }
}
