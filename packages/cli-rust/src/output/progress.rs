//! Host progress bar
//!
//! Counts finished hosts while sequences run, with elapsed time.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use termrun_core::SequenceReport;

/// Progress over all dispatched hosts
///
/// Hidden in quiet mode and while sessions echo to the terminal, so the bar
/// never interleaves with session output.
#[derive(Clone)]
pub struct RunProgress {
    bar: Option<ProgressBar>,
}

impl RunProgress {
    /// Create a progress bar for `total` hosts
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:30.cyan/dim}] {pos}/{len} hosts {msg} ({elapsed_precise:.dim})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    /// Create a progress bar unless `hidden`
    pub fn new_maybe(total: usize, hidden: bool) -> Self {
        if hidden {
            Self { bar: None }
        } else {
            Self::new(total)
        }
    }

    /// Count one finished host
    pub fn record(&self, report: &SequenceReport) {
        if let Some(ref bar) = self.bar {
            if !report.is_success() {
                bar.println(format!(
                    "{} {}",
                    console::style("\u{2717}").red(),
                    report.host
                ));
            }
            bar.set_message(report.host.clone());
            bar.inc(1);
        }
    }

    /// Clear the bar once every host is done
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}
