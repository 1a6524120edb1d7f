//! ui
//!
//! What the user sees and answers.
//!
//! - [`output`]: progress lines, warnings and errors, gated by [`output::Verbosity`]
//! - [`prompts`]: yes/no questions behind the [`prompts::Prompter`] trait
//!
//! Diagnostic logging is separate and goes through `tracing`.

pub mod output;
pub mod prompts;
