//! Account lifecycle audit.
//!
//! Collects account creation (4720), enabling (4722), disabling (4725) and
//! deletion (4726) events. Lockouts (4740) and unlocks (4767) can be added
//! with `--kinds`.
//!
//! # Usage
//!
//! ```bash
//! seclog-audit lifecycle --start 2025-10-01 --end 2025-10-31 \
//!     --archive-dir /var/log/security --utc-offset +02:00
//!
//! # Include lockouts, newest sources first
//! seclog-audit lifecycle --start 2025-10-01 --end 2025-10-31 \
//!     --kinds 4720,4722,4725,4726,4740,4767 --order newest \
//!     --live Security.jsonl --consolidated
//! ```
//!
//! Timestamps are wall-clock time in the local zone, or in the zone given by
//! `--utc-offset`.

use crate::audit::types::{AuditMode, NormalizedRow};
use crate::commands::audit_run::{execute, print_artifacts, print_source_table, RunOptions};
use crate::utils::format::{format_number, truncate};
use anyhow::Result;
use std::collections::BTreeMap;

/// Number of events per action.
pub fn actions(rows: &[NormalizedRow]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        if let NormalizedRow::Lifecycle(row) = row {
            *counts.entry(row.action.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn run(options: &RunOptions) -> Result<()> {
    let report = execute(AuditMode::Lifecycle, options)?;

    print_source_table(&report);

    println!("\n{:<20} {:>15}", "Action", "Count");
    println!("{}", "-".repeat(100));
    for (action, count) in actions(&report.consolidated) {
        println!("{:<20} {:>15}", action, format_number(count));
    }

    println!("\n{:<21} {:<8} {:<12} {:<28} {:<28}", "Timestamp", "Event", "Action", "Target", "Actor");
    println!("{}", "-".repeat(100));
    for row in &report.consolidated {
        if let NormalizedRow::Lifecycle(row) = row {
            println!(
                "{:<21} {:<8} {:<12} {:<28} {:<28}",
                row.timestamp,
                row.event_id,
                row.action,
                truncate(&row.target_account, 28),
                truncate(&row.actor_account, 28)
            );
        }
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
    fn test_actions() {
        let normalizer = Normalizer::new(AuditMode::Lifecycle);
        let rows: Vec<NormalizedRow> = [
            RawEventRecord::new(4720, "2025-10-01T08:00:00Z"),
            RawEventRecord::new(4726, "2025-10-02T08:00:00Z"),
            RawEventRecord::new(4720, "2025-10-03T08:00:00Z"),
        ]
        .iter()
        .map(|r| normalizer.normalize(r).unwrap())
        .collect();

        let counts = actions(&rows);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.values().sum::<usize>(), 3);
        assert_eq!(counts.get("Created"), Some(&2));
        assert_eq!(counts.get("Deleted"), Some(&1));
    }
}
