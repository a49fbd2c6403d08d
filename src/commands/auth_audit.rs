//! Authentication audit.
//!
//! Collects Kerberos ticket grants (4768), pre-authentication failures (4771)
//! and NTLM credential validations (4776), optionally restricted to a set of
//! accounts and to successful or failed attempts.
//!
//! # Usage
//!
//! ```bash
//! # Everything for October from the live log and its archives
//! seclog-audit auth --start 2025-10-01 --end 2025-10-31 \
//!     --live Security.jsonl --archive-dir /var/log/security
//!
//! # Failures only, with readable status text and a per-account summary
//! seclog-audit auth --start 2025-10-01 --end 2025-10-31 \
//!     --accounts-file admins.txt --scope failure --status-style described \
//!     --archive-dir /var/log/security --summary --consolidated
//! ```
//!
//! # Output
//!
//! One `auth_<source>.csv` per source read, plus `auth_consolidated_<stamp>.csv`
//! and `auth_summary_<stamp>.csv` when requested. The console report shows
//! per-source row counts, the outcome breakdown and the account summary.

use crate::audit::pipeline::RunReport;
use crate::audit::types::{AccountSummaryRow, AuditMode, NormalizedRow};
use crate::commands::audit_run::{execute, print_artifacts, print_source_table, RunOptions};
use crate::utils::format::{format_number, truncate};
use anyhow::Result;
use std::collections::BTreeMap;

/// Outcome and event counts over all rows of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OutcomeBreakdown {
    pub success: usize,
    pub failure: usize,
    pub unknown: usize,
    pub by_event: BTreeMap<u32, usize>,
}

pub fn breakdown(rows: &[NormalizedRow]) -> OutcomeBreakdown {
    let mut result = OutcomeBreakdown::default();
    for row in rows.iter().filter_map(NormalizedRow::as_auth) {
        if row.outcome.is_success() {
            result.success += 1;
        } else if row.outcome.is_failure() {
            result.failure += 1;
        } else {
            result.unknown += 1;
        }
        *result.by_event.entry(row.event_id).or_insert(0) += 1;
    }
    result
}

fn print_breakdown(report: &RunReport) {
    let counts = breakdown(&report.consolidated);
    let total = report.total_rows().max(1) as f64;

    println!("\nOutcomes");
    println!("{}", "-".repeat(100));
    println!("{:<20} {:>15} {:>12}", "Outcome", "Count", "Percentage");
    println!("{}", "-".repeat(100));
    for (label, count) in [
        ("Success", counts.success),
        ("Failure", counts.failure),
        ("Unknown", counts.unknown),
    ] {
        let pct = (count as f64 / total) * 100.0;
        println!("{:<20} {:>15} {:>11.2}%", label, format_number(count), pct);
    }

    println!("\n{:<20} {:>15}", "Event ID", "Count");
    println!("{}", "-".repeat(100));
    for (id, count) in &counts.by_event {
        println!("{:<20} {:>15}", id, format_number(*count));
    }
}

fn print_summary(summary: &[AccountSummaryRow]) {
    println!("\nAccounts");
    println!("{}", "-".repeat(100));
    println!(
        "{:<30} {:>10} {:>10} {:<26} {:<20}",
        "Account", "Success", "Failed", "Last Seen (UTC)", "Last Status"
    );
    println!("{}", "-".repeat(100));
    for row in summary {
        println!(
            "{:<30} {:>10} {:>10} {:<26} {:<20}",
            truncate(&row.account, 30),
            format_number(row.success_count),
            format_number(row.fail_count),
            row.last_seen_timestamp_utc.as_deref().unwrap_or("-"),
            truncate(row.last_seen_status.as_deref().unwrap_or("-"), 20)
        );
    }
}

pub fn run(options: &RunOptions) -> Result<()> {
    let report = execute(AuditMode::Authentication, options)?;

    print_source_table(&report);
    print_breakdown(&report);
    if let Some(summary) = &report.summary {
        print_summary(summary);
    }
    println!("{}", "=".repeat(100));
    print_artifacts(&report);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::normalizer::Normalizer;
    use crate::audit::types::RawEventRecord;

    #[test]
    fn test_breakdown() {
        let normalizer = Normalizer::new(AuditMode::Authentication);
        let rows: Vec<NormalizedRow> = [
            RawEventRecord::new(4768, "2025-10-01T08:00:00Z"),
            RawEventRecord::new(4771, "2025-10-01T09:00:00Z"),
            RawEventRecord::new(4776, "2025-10-01T10:00:00Z").with_field("Status", "0x0"),
            RawEventRecord::new(4776, "2025-10-01T11:00:00Z"),
        ]
        .iter()
        .map(|r| normalizer.normalize(r).unwrap())
        .collect();

        let counts = breakdown(&rows);
        assert_eq!(counts.success, 2);
        assert_eq!(counts.failure, 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.by_event.get(&4776), Some(&2));
    }
}
