//! Output utilities for CLI commands
//!
//! Progress display while hosts run, outcome colors and the final
//! summary table.

pub mod colors;
pub mod progress;
pub mod summary;

pub use colors::{Outcome, outcome_style};
pub use progress::RunProgress;
pub use summary::{summary_rows, summary_table};
