//! Artifact export.
//!
//! The pipeline hands finished row sets to a [`RowSink`]. [`CsvSink`] writes
//! one CSV file per artifact with a fixed header, so an empty row set still
//! produces a header-only file.

use crate::audit::types::{AccountSummaryRow, AuditMode, NormalizedRow};
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Destination for exported row sets.
pub trait RowSink {
    /// Rows of one source, written as soon as the source is finished.
    fn write_source(&mut self, tag: &str, mode: AuditMode, rows: &[NormalizedRow]) -> Result<PathBuf>;

    /// All rows of the run.
    fn write_consolidated(&mut self, mode: AuditMode, rows: &[NormalizedRow]) -> Result<PathBuf>;

    /// Per-account rollup.
    fn write_summary(&mut self, rows: &[AccountSummaryRow]) -> Result<PathBuf>;
}

/// Writes artifacts as CSV files into one directory.
///
/// File names: `<prefix>_<source tag>.csv`, `<prefix>_consolidated_<stamp>.csv`
/// and `<prefix>_summary_<stamp>.csv`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    out_dir: PathBuf,
    run_stamp: String,
}

impl CsvSink {
    pub fn new(out_dir: impl Into<PathBuf>, run_stamp: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            run_stamp: run_stamp.into(),
        }
    }

    fn target(&self, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir).with_context(|| {
            format!("Failed to create output directory: {}", self.out_dir.display())
        })?;
        Ok(self.out_dir.join(format!("{}.csv", sanitize(name))))
    }
}

/// Keep file names portable.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

fn write_rows(path: &Path, mode: AuditMode, rows: &[NormalizedRow]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(mode.columns())?;

    for row in rows {
        match row {
            NormalizedRow::Auth(r) if mode == AuditMode::Authentication => writer.serialize(r)?,
            NormalizedRow::Lifecycle(r) if mode == AuditMode::Lifecycle => writer.serialize(r)?,
            other => bail!(
                "Cannot write a {} row into a {} artifact",
                other.mode(),
                mode
            ),
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

impl RowSink for CsvSink {
    fn write_source(&mut self, tag: &str, mode: AuditMode, rows: &[NormalizedRow]) -> Result<PathBuf> {
        let path = self.target(&format!("{}_{}", mode.artifact_prefix(), tag))?;
        write_rows(&path, mode, rows)?;
        Ok(path)
    }

    fn write_consolidated(&mut self, mode: AuditMode, rows: &[NormalizedRow]) -> Result<PathBuf> {
        let path = self.target(&format!(
            "{}_consolidated_{}",
            mode.artifact_prefix(),
            self.run_stamp
        ))?;
        write_rows(&path, mode, rows)?;
        Ok(path)
    }

    fn write_summary(&mut self, rows: &[AccountSummaryRow]) -> Result<PathBuf> {
        let path = self.target(&format!(
            "{}_summary_{}",
            AuditMode::Authentication.artifact_prefix(),
            self.run_stamp
        ))?;

        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(AccountSummaryRow::COLUMNS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::{AuthRow, LifecycleRow, Outcome};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn auth_row() -> NormalizedRow {
        NormalizedRow::Auth(AuthRow {
            timestamp_utc: "2025-10-02T08:15:00.000Z".to_string(),
            event_id: 4771,
            event_name: "Kerberos pre-authentication failed".to_string(),
            account: "alice".to_string(),
            client_address: "10.0.0.5".to_string(),
            workstation: String::new(),
            logon_type: String::new(),
            status: "0x18".to_string(),
            source: "Live_20251107_120000".to_string(),
            source_file: "Security.jsonl".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 10, 2, 8, 15, 0).unwrap(),
            outcome: Outcome::Failure(Some("0x18".to_string())),
        })
    }

    #[test]
    fn test_empty_source_still_gets_header() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path().join("out"), "20251107_120000");

        let path = sink.write_source("Archive_2025-10-03-12-00-00-123_1", AuditMode::Authentication, &[]).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "auth_Archive_2025-10-03-12-00-00-123_1.csv"
        );
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "TimestampUTC,EventID,EventName,Account,ClientAddress,Workstation,LogonType,Status,Source,SourceFile\n"
        );
    }

    #[test]
    fn test_rows_written_in_column_order() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path(), "20251107_120000");

        let path = sink.write_consolidated(AuditMode::Authentication, &[auth_row()]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "2025-10-02T08:15:00.000Z,4771,Kerberos pre-authentication failed,alice,10.0.0.5,,,0x18,Live_20251107_120000,Security.jsonl"
        );
    }

    #[test]
    fn test_mode_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path(), "20251107_120000");
        let row = NormalizedRow::Lifecycle(LifecycleRow {
            timestamp: "2025-10-02 10:15:00".to_string(),
            event_id: 4720,
            action: "Created".to_string(),
            target_account: "erin".to_string(),
            actor_account: "admin".to_string(),
            source: "Live_x".to_string(),
        });
        assert!(sink.write_source("Live_x", AuditMode::Authentication, &[row]).is_err());
    }

    #[test]
    fn test_summary_with_empty_last_seen() {
        let dir = TempDir::new().unwrap();
        let mut sink = CsvSink::new(dir.path(), "20251107_120000");
        let rows = vec![AccountSummaryRow {
            account: "bob".to_string(),
            success_count: 0,
            fail_count: 0,
            last_seen_timestamp_utc: None,
            last_seen_event_id: None,
            last_seen_status: None,
        }];

        let path = sink.write_summary(&rows).unwrap();
        assert!(path.ends_with("auth_summary_20251107_120000.csv"));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Account,SuccessCount,FailCount,LastSeenTimestampUTC,LastSeenEventID,LastSeenStatus\nbob,0,0,,,\n"
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Live_2025/10:01"), "Live_2025_10_01");
    }
}
