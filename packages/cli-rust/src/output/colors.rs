//! Color utilities for CLI output
//!
//! Provides consistent styling for per-host outcomes.

use console::{Style, StyledObject};

/// Outcome of one host as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Style an outcome label
///
/// - ok -> green bold
/// - failed -> red
/// - skipped -> yellow
pub fn outcome_style(outcome: Outcome) -> StyledObject<&'static str> {
    let style = match outcome {
        Outcome::Ok => Style::new().green().bold(),
        Outcome::Failed => Style::new().red(),
        Outcome::Skipped => Style::new().yellow(),
    };
    style.apply_to(outcome.label())
}
