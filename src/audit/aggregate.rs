//! Per-account rollup of authentication rows.

use crate::audit::predicate::AccountFilter;
use crate::audit::types::{AccountSummaryRow, AuthRow, NormalizedRow};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct AccountState<'a> {
    success: usize,
    fail: usize,
    last_seen: Option<&'a AuthRow>,
}

/// Summarize `rows` by account, sorted by account name.
///
/// The most recent row per account wins; when timestamps tie, the row seen
/// first in `rows` is kept. Rows without an account are ignored. Every
/// account named by a concrete `filter` gets a row, even with no activity.
pub fn summarize_accounts(rows: &[NormalizedRow], filter: &AccountFilter) -> Vec<AccountSummaryRow> {
    let mut accounts: BTreeMap<&str, AccountState<'_>> = BTreeMap::new();

    for name in filter.names() {
        accounts.entry(name.as_str()).or_default();
    }

    for row in rows.iter().filter_map(NormalizedRow::as_auth) {
        if row.account.is_empty() {
            continue;
        }
        let state = accounts.entry(row.account.as_str()).or_default();
        if row.outcome.is_success() {
            state.success += 1;
        } else if row.outcome.is_failure() {
            state.fail += 1;
        }

        let newer = state.last_seen.map_or(true, |seen| row.timestamp > seen.timestamp);
        if newer {
            state.last_seen = Some(row);
        }
    }

    accounts
        .into_iter()
        .map(|(account, state)| AccountSummaryRow {
            account: account.to_string(),
            success_count: state.success,
            fail_count: state.fail,
            last_seen_timestamp_utc: state.last_seen.map(|r| r.timestamp_utc.clone()),
            last_seen_event_id: state.last_seen.map(|r| r.event_id),
            last_seen_status: state.last_seen.map(|r| r.status.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::normalizer::Normalizer;
    use crate::audit::types::{AuditMode, RawEventRecord};

    fn row(id: u32, ts: &str, account: &str, status: Option<&str>, source: &str) -> NormalizedRow {
        let mut record = RawEventRecord::new(id, ts);
        if !account.is_empty() {
            record = record.with_field("TargetUserName", account);
        }
        if let Some(status) = status {
            record = record.with_field("Status", status);
        }
        let mut row = Normalizer::new(AuditMode::Authentication).normalize(&record).unwrap();
        row.tag_source(source, "Security.jsonl");
        row
    }

    #[test]
    fn test_counts_and_last_seen() {
        let rows = vec![
            row(4768, "2025-10-01T08:00:00Z", "alice", None, "a"),
            row(4771, "2025-10-03T08:00:00Z", "alice", Some("0x18"), "a"),
            row(4776, "2025-10-02T08:00:00Z", "alice", Some("0x0"), "b"),
            row(4776, "2025-10-02T09:00:00Z", "carol", Some("0xC000006A"), "b"),
        ];

        let summary = summarize_accounts(&rows, &AccountFilter::All);
        assert_eq!(summary.len(), 2);

        let alice = &summary[0];
        assert_eq!(alice.account, "alice");
        assert_eq!(alice.success_count, 2);
        assert_eq!(alice.fail_count, 1);
        assert_eq!(alice.last_seen_timestamp_utc.as_deref(), Some("2025-10-03T08:00:00.000Z"));
        assert_eq!(alice.last_seen_event_id, Some(4771));
        assert_eq!(alice.last_seen_status.as_deref(), Some("0x18"));

        assert_eq!(summary[1].account, "carol");
        assert_eq!(summary[1].fail_count, 1);
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let rows = vec![
            row(4771, "2025-10-03T08:00:00Z", "alice", Some("0x18"), "first"),
            row(4768, "2025-10-03T08:00:00Z", "alice", None, "second"),
        ];

        let summary = summarize_accounts(&rows, &AccountFilter::All);
        assert_eq!(summary[0].last_seen_event_id, Some(4771));
        assert_eq!(summary[0].last_seen_status.as_deref(), Some("0x18"));
    }

    #[test]
    fn test_filtered_account_without_rows_is_kept() {
        let rows = vec![row(4768, "2025-10-01T08:00:00Z", "alice", None, "a")];
        let filter = AccountFilter::from_names(["alice", "bob"]).unwrap();

        let summary = summarize_accounts(&rows, &filter);
        assert_eq!(summary.len(), 2);
        let bob = &summary[1];
        assert_eq!(bob.account, "bob");
        assert_eq!(bob.success_count, 0);
        assert_eq!(bob.fail_count, 0);
        assert_eq!(bob.last_seen_timestamp_utc, None);
        assert_eq!(bob.last_seen_event_id, None);
        assert_eq!(bob.last_seen_status, None);
    }

    #[test]
    fn test_rows_without_account_are_excluded() {
        let rows = vec![
            row(4768, "2025-10-01T08:00:00Z", "", None, "a"),
            row(4768, "2025-10-01T09:00:00Z", "alice", None, "a"),
        ];
        let summary = summarize_accounts(&rows, &AccountFilter::All);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].account, "alice");
    }

    #[test]
    fn test_unknown_outcome_counts_neither() {
        let rows = vec![row(4776, "2025-10-01T08:00:00Z", "dave", None, "a")];
        let summary = summarize_accounts(&rows, &AccountFilter::All);
        assert_eq!(summary[0].success_count, 0);
        assert_eq!(summary[0].fail_count, 0);
        assert_eq!(summary[0].last_seen_event_id, Some(4776));
        assert_eq!(summary[0].last_seen_status.as_deref(), Some(""));
    }

    #[test]
    fn test_sorted_by_account() {
        let rows = vec![
            row(4768, "2025-10-01T08:00:00Z", "zoe", None, "a"),
            row(4768, "2025-10-01T08:00:00Z", "Bob", None, "a"),
            row(4768, "2025-10-01T08:00:00Z", "alice", None, "a"),
        ];
        let names: Vec<_> = summarize_accounts(&rows, &AccountFilter::All)
            .into_iter()
            .map(|r| r.account)
            .collect();
        assert_eq!(names, vec!["Bob", "alice", "zoe"]);
    }
}
