//! Run summary table

use comfy_table::{Cell, Color, Table};
use termrun_core::{DispatchSummary, SequenceReport};

use super::colors::Outcome;

/// One row of the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRow {
    pub host: String,
    pub outcome: Outcome,
    pub commands: usize,
    pub detail: String,
}

/// Rows for finished reports, then hosts that never ran
pub fn summary_rows(reports: &[SequenceReport], dispatch: &DispatchSummary) -> Vec<HostRow> {
    let mut rows: Vec<HostRow> = reports
        .iter()
        .map(|report| HostRow {
            host: report.host.clone(),
            outcome: if report.is_success() {
                Outcome::Ok
            } else {
                Outcome::Failed
            },
            commands: report.commands,
            detail: report.error.clone().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| a.host.cmp(&b.host));

    rows.extend(dispatch.failed.iter().map(|(host, error)| HostRow {
        host: host.clone(),
        outcome: Outcome::Failed,
        commands: 0,
        detail: error.clone(),
    }));
    rows.extend(dispatch.skipped.iter().map(|host| HostRow {
        host: host.clone(),
        outcome: Outcome::Skipped,
        commands: 0,
        detail: "unsupported protocol".to_string(),
    }));
    rows
}

/// Render the per-host outcome table
pub fn summary_table(rows: &[HostRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Host", "Result", "Commands", "Detail"]);

    for row in rows {
        let color = match row.outcome {
            Outcome::Ok => Color::Green,
            Outcome::Failed => Color::Red,
            Outcome::Skipped => Color::Yellow,
        };
        table.add_row(vec![
            Cell::new(&row.host),
            Cell::new(row.outcome.label()).fg(color),
            Cell::new(row.commands.to_string()),
            Cell::new(&row.detail),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_sorted_and_skipped_last() {
        let reports = vec![
            SequenceReport {
                host: "r2.lab".to_string(),
                commands: 0,
                error: Some("Connection to r2.lab failed: refused".to_string()),
            },
            SequenceReport {
                host: "r1.lab".to_string(),
                commands: 3,
                error: None,
            },
        ];
        let dispatch = DispatchSummary {
            submitted: 2,
            skipped: vec!["ftp://r3".to_string()],
            failed: vec![("r4".to_string(), "undefined variable".to_string())],
        };
        let rows = summary_rows(&reports, &dispatch);

        let hosts: Vec<&str> = rows.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, ["r1.lab", "r2.lab", "r4", "ftp://r3"]);
        assert_eq!(rows[0].outcome, Outcome::Ok);
        assert_eq!(rows[1].outcome, Outcome::Failed);
        assert_eq!(rows[2].outcome, Outcome::Failed);
        assert_eq!(rows[2].detail, "undefined variable");
        assert_eq!(rows[3].outcome, Outcome::Skipped);
    }

    #[test]
    fn table_lists_every_host() {
        let dispatch = DispatchSummary {
            skipped: vec!["ftp://r3".to_string()],
            ..DispatchSummary::default()
        };
        let rows = summary_rows(&[], &dispatch);
        let rendered = summary_table(&rows).to_string();
        assert!(rendered.contains("ftp://r3"));
        assert!(rendered.contains("skipped"));
    }
}
