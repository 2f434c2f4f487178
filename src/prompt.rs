//! Operator password prompt
//!
//! [`request_password`] drives a bounded retry-until-valid loop over any
//! [`PasswordPrompt`]. Cancellation and a missing terminal are distinct
//! outcomes that end the loop immediately; invalid input and terminal errors
//! each consume an attempt.

use crate::domain::ports::{PasswordPrompt, PromptResponse};
use crate::error::{Error, Result};
use console::{style, Term};
use std::io::ErrorKind;
use tracing::warn;

/// Label shown when asking for the console shared password
pub const SHARED_PASSWORD_LABEL: &str = "Enter a new password to be used for the Admin Console:";

/// Minimum accepted shared password length
pub const MIN_PASSWORD_LEN: usize = 6;

/// Default number of attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Validation rule for the console shared password
pub fn validate_shared_password(input: &str) -> std::result::Result<(), String> {
    if input.chars().count() < MIN_PASSWORD_LEN {
        return Err("please enter a longer password".to_string());
    }
    Ok(())
}

/// Ask until `validate` accepts an answer, the operator cancels, or
/// `max_attempts` answers have been rejected
pub fn request_password<F>(
    prompt: &dyn PasswordPrompt,
    label: &str,
    max_attempts: u32,
    validate: F,
) -> Result<String>
where
    F: Fn(&str) -> std::result::Result<(), String>,
{
    for attempt in 1..=max_attempts {
        match prompt.ask(label) {
            Ok(PromptResponse::Entered(input)) => match validate(&input) {
                Ok(()) => return Ok(input),
                Err(reason) => {
                    warn!(attempt, "Rejected password input: {}", reason);
                    prompt.reject(&reason);
                }
            },
            Ok(PromptResponse::Cancelled) => return Err(Error::PromptCancelled),
            Ok(PromptResponse::Unavailable) => return Err(Error::PromptUnavailable),
            Err(e) => {
                warn!(attempt, "Password prompt failed: {}", e);
                prompt.reject("could not read input");
            }
        }
    }

    Err(Error::PromptExhausted {
        attempts: max_attempts,
    })
}

// =============================================================================
// Terminal Prompt
// =============================================================================

/// Masked password prompt on the controlling terminal
#[derive(Debug, Clone)]
pub struct TerminalPrompt {
    term: Term,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordPrompt for TerminalPrompt {
    fn ask(&self, label: &str) -> std::io::Result<PromptResponse> {
        if !self.term.is_term() {
            return Ok(PromptResponse::Unavailable);
        }

        self.term.write_str(&format!("{} ", style(label).bold()))?;
        match self.term.read_secure_line() {
            Ok(line) => Ok(PromptResponse::Entered(line)),
            Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::UnexpectedEof) => {
                Ok(PromptResponse::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    fn reject(&self, reason: &str) {
        let _ = self.term.write_line(&format!("{}", style(reason).red()));
    }
}

// =============================================================================
// Disabled Prompt
// =============================================================================

/// Prompt for non-interactive runs; nobody is ever asked
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPrompt;

impl PasswordPrompt for DisabledPrompt {
    fn ask(&self, _label: &str) -> std::io::Result<PromptResponse> {
        Ok(PromptResponse::Unavailable)
    }

    fn reject(&self, _reason: &str) {}
}
