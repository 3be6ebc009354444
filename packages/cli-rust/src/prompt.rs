//! Terminal prompts for host placeholders
//!
//! Answers `{label}` placeholders in host strings with dialoguer. Values
//! that look like passwords are read without echo.

use console::Term;
use dialoguer::{Input, Password};
use termrun_core::{CredentialResolver, HostError, PlaceholderRequest};

/// Resolves placeholders by asking on the terminal
///
/// Answers are cached per placeholder so a host list repeating
/// `{password}` only asks once.
#[derive(Default)]
pub struct TerminalResolver {
    answers: Vec<(PlaceholderRequest, String)>,
}

impl TerminalResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn ask(request: &PlaceholderRequest) -> Result<String, dialoguer::Error> {
        if request.is_secret() {
            Password::new()
                .with_prompt(request.prompt())
                .allow_empty_password(true)
                .interact()
        } else {
            Input::<String>::new()
                .with_prompt(request.prompt())
                .allow_empty(true)
                .interact_text()
        }
    }
}

impl CredentialResolver for TerminalResolver {
    fn resolve(&mut self, request: &PlaceholderRequest) -> Result<String, HostError> {
        if let Some((_, answer)) = self.answers.iter().find(|(asked, _)| asked == request) {
            return Ok(answer.clone());
        }

        let answer = Self::ask(request).map_err(|e| {
            // Restore the cursor after Ctrl+C
            let _ = Term::stderr().show_cursor();
            HostError::Prompt {
                key: request.key.clone(),
                reason: e.to_string(),
            }
        })?;
        self.answers.push((request.clone(), answer.clone()));
        Ok(answer)
    }
}
