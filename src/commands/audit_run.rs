//! Shared setup and reporting for the `auth` and `lifecycle` commands.
//!
//! Both commands validate their options into an [`AuditRequest`], open the
//! selected sources, hand everything to
//! [`run_audit`](crate::audit::pipeline::run_audit) and print the same
//! per-source table. Only the mode-specific report sections differ.

use crate::audit::error::SetupError;
use crate::audit::export::CsvSink;
use crate::audit::normalizer::StatusStyle;
use crate::audit::pipeline::{run_audit, AuditRequest, MissingStatusPolicy, OutcomeScope, RowPolicy, RunReport, SourceStatus};
use crate::audit::predicate::{AccountFilter, TimeRange};
use crate::audit::scheduler::SourceOrder;
use crate::audit::source::{discover_archives, EventSource, JsonLinesSource};
use crate::audit::types::{AuditMode, EventKind, SourceDescriptor};
use crate::utils::format::{format_number, truncate};
use crate::utils::time::{run_stamp, ReportZone};
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Which sources a run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSelection {
    Live,
    Archives,
    #[default]
    Both,
}

impl SourceSelection {
    const fn name(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Archives => "archive",
            Self::Both => "live or archive",
        }
    }
}

/// Options shared by both audit commands, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub start: String,
    pub end: String,
    pub accounts: Vec<String>,
    pub accounts_file: Option<PathBuf>,
    /// Event IDs; empty selects the mode's defaults.
    pub kinds: Vec<u32>,
    pub archive_dir: Option<PathBuf>,
    pub live: Option<PathBuf>,
    pub sources: SourceSelection,
    pub order: SourceOrder,
    pub output_dir: PathBuf,
    pub consolidated: bool,
    pub summary: bool,
    pub status_style: StatusStyle,
    pub scope: OutcomeScope,
    pub missing_status: MissingStatusPolicy,
    pub utc_offset: Option<String>,
    pub show_progress: bool,
}

/// Build the account filter from `--accounts` and `--accounts-file`.
///
/// Neither given means every account. Account files hold one name per line;
/// blank lines and `#` comments are ignored.
pub fn load_accounts(names: &[String], file: Option<&Path>) -> Result<AccountFilter, SetupError> {
    let mut all: Vec<String> = names.to_vec();

    if let Some(path) = file {
        let content = fs::read_to_string(path).map_err(|e| SetupError::AccountListUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#'))
                .map(str::to_string),
        );
    } else if names.is_empty() {
        return Ok(AccountFilter::All);
    }

    AccountFilter::from_names(all)
}

pub fn parse_kinds(ids: &[u32]) -> Result<Vec<EventKind>, SetupError> {
    ids.iter()
        .map(|&id| EventKind::from_id(id).ok_or(SetupError::UnknownEventKind { id }))
        .collect()
}

pub fn parse_zone(offset: Option<&str>) -> Result<ReportZone, SetupError> {
    match offset {
        None => Ok(ReportZone::Local),
        Some(input) => ReportZone::parse_offset(input).ok_or_else(|| SetupError::InvalidOffset {
            input: input.to_string(),
        }),
    }
}

/// Validate `options` into a request. Nothing is read besides the account file.
pub fn build_request(mode: AuditMode, options: &RunOptions, stamp: &str) -> Result<AuditRequest, SetupError> {
    let range = TimeRange::parse(&options.start, &options.end)?;

    let mut request = AuditRequest::new(mode, range, stamp);
    request.kinds = parse_kinds(&options.kinds)?;
    request.accounts = load_accounts(&options.accounts, options.accounts_file.as_deref())?;
    request.order = options.order;
    request.status_style = options.status_style;
    request.zone = parse_zone(options.utc_offset.as_deref())?;
    request.row_policy = RowPolicy {
        scope: options.scope,
        missing_status: options.missing_status,
    };
    request.write_consolidated = options.consolidated;
    request.write_summary = options.summary;

    // Fail on kind errors before any source is opened.
    request.predicate()?;
    Ok(request)
}

/// Sources picked by `--sources`.
pub struct SelectedSources {
    pub archives: Vec<Box<dyn EventSource>>,
    pub live: Option<Box<dyn EventSource>>,
}

fn check_sources(options: &RunOptions) -> Result<(Option<&Path>, Option<&Path>), SetupError> {
    let want_live = options.sources != SourceSelection::Archives;
    let want_archives = options.sources != SourceSelection::Live;

    let live = options.live.as_deref().filter(|_| want_live);
    let archive_dir = options.archive_dir.as_deref().filter(|_| want_archives);

    if live.is_none() && archive_dir.is_none() {
        return Err(SetupError::NoSourceSelected {
            selection: options.sources.name(),
        });
    }
    if let Some(path) = live {
        if !path.is_file() {
            return Err(SetupError::LiveSourceMissing {
                path: path.to_path_buf(),
            });
        }
    }
    if let Some(path) = archive_dir {
        if !path.is_dir() {
            return Err(SetupError::ArchiveDirMissing {
                path: path.to_path_buf(),
            });
        }
    }
    Ok((live, archive_dir))
}

/// Check and open the selected sources.
pub fn select_sources(options: &RunOptions) -> Result<SelectedSources> {
    let (live, archive_dir) = check_sources(options)?;

    let archives = match archive_dir {
        Some(dir) => {
            let found = discover_archives(dir)?;
            eprintln!("Found {} archived segment(s) in {}", found.len(), dir.display());
            found
                .into_iter()
                .map(|descriptor| Box::new(JsonLinesSource::new(descriptor)) as Box<dyn EventSource>)
                .collect()
        }
        None => Vec::new(),
    };

    let live = live.map(|path| Box::new(JsonLinesSource::new(SourceDescriptor::live(path))) as Box<dyn EventSource>);

    Ok(SelectedSources { archives, live })
}

/// Validate, read and export one audit run.
pub fn execute(mode: AuditMode, options: &RunOptions) -> Result<RunReport> {
    let stamp = run_stamp(&Local::now());
    let request = build_request(mode, options, &stamp)?;
    let sources = select_sources(options)?;

    eprintln!(
        "Auditing {} events from {} to {}",
        mode,
        request.range.start(),
        request.range.end()
    );

    let mut sink = CsvSink::new(&options.output_dir, &stamp);
    let report = run_audit(&request, sources.archives, sources.live, &mut sink, options.show_progress)
        .with_context(|| format!("Failed to start {} audit", mode))?;

    eprintln!("\nTotal: {} rows", format_number(report.total_rows()));
    Ok(report)
}

/// Per-source outcome table shared by both commands.
pub fn print_source_table(report: &RunReport) {
    println!("\n{}", "=".repeat(100));
    println!("Sources");
    println!("{}", "=".repeat(100));
    println!("{:<45} {:<25} {:>10} {:>10} {:<8}", "Source", "Window", "Rows", "Skipped", "Status");
    println!("{}", "-".repeat(100));

    for source in &report.sources {
        let window = source
            .descriptor
            .window
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = match &source.status {
            SourceStatus::Exported(_) => "ok",
            SourceStatus::ExportFailed(_) => "export failed",
            SourceStatus::ReadFailed(_) => "read failed",
        };
        println!(
            "{:<45} {:<25} {:>10} {:>10} {:<8}",
            truncate(&source.tag, 45),
            window,
            format_number(source.rows),
            format_number(source.bad_records),
            status
        );
    }

    if !report.excluded.is_empty() {
        println!("{}", "-".repeat(100));
        println!("Excluded archives:");
        for excluded in &report.excluded {
            println!("  {} ({})", excluded.descriptor.file_name(), excluded.reason);
        }
    }
    println!("{}", "-".repeat(100));
    println!("Total rows: {}", format_number(report.total_rows()));
}

/// Where the artifacts went.
pub fn print_artifacts(report: &RunReport) {
    println!("\nArtifacts:");
    for source in &report.sources {
        match &source.status {
            SourceStatus::Exported(path) => println!("  {}", path.display()),
            SourceStatus::ExportFailed(e) => println!("  {} (not written: {})", source.tag, e),
            SourceStatus::ReadFailed(e) => println!("  {} (skipped: {})", source.tag, e),
        }
    }
    for artifact in [&report.consolidated_artifact, &report.summary_artifact].into_iter().flatten() {
        match artifact {
            Ok(path) => println!("  {}", path.display()),
            Err(e) => println!("  (not written: {})", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options() -> RunOptions {
        RunOptions {
            start: "2025-10-01".to_string(),
            end: "2025-10-31".to_string(),
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_load_accounts_merges_list_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.txt");
        fs::write(&path, "# service accounts\nsvc-backup\n\n  alice  \n").unwrap();

        let filter = load_accounts(&["alice".to_string(), "bob".to_string()], Some(&path)).unwrap();
        assert_eq!(filter.names(), ["alice", "bob", "svc-backup"]);
    }

    #[test]
    fn test_load_accounts_defaults_to_all() {
        assert!(load_accounts(&[], None).unwrap().is_all());
    }

    #[test]
    fn test_load_accounts_errors() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "# nothing here\n\n").unwrap();
        assert!(matches!(load_accounts(&[], Some(&empty)), Err(SetupError::EmptyAccountList)));

        let missing = dir.path().join("missing.txt");
        assert!(matches!(
            load_accounts(&[], Some(&missing)),
            Err(SetupError::AccountListUnreadable { .. })
        ));

        assert!(matches!(load_accounts(&[" ".to_string()], None), Err(SetupError::EmptyAccountList)));
    }

    #[test]
    fn test_build_request_validates() {
        let request = build_request(AuditMode::Authentication, &options(), "20251107_120000").unwrap();
        assert_eq!(request.run_stamp, "20251107_120000");
        assert!(request.accounts.is_all());

        let reversed = RunOptions {
            start: "2025-10-31".to_string(),
            end: "2025-10-01".to_string(),
            ..options()
        };
        assert!(matches!(
            build_request(AuditMode::Authentication, &reversed, "x"),
            Err(SetupError::InvalidRange { .. })
        ));

        let unknown = RunOptions {
            kinds: vec![1102],
            ..options()
        };
        assert!(matches!(
            build_request(AuditMode::Authentication, &unknown, "x"),
            Err(SetupError::UnknownEventKind { id: 1102 })
        ));

        let mismatched = RunOptions {
            kinds: vec![4720],
            ..options()
        };
        assert!(matches!(
            build_request(AuditMode::Authentication, &mismatched, "x"),
            Err(SetupError::KindModeMismatch { id: 4720, .. })
        ));

        let bad_offset = RunOptions {
            utc_offset: Some("+25:00".to_string()),
            ..options()
        };
        assert!(matches!(
            build_request(AuditMode::Lifecycle, &bad_offset, "x"),
            Err(SetupError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_source_checks() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(check_sources(&options()), Err(SetupError::NoSourceSelected { .. })));

        let live_only = RunOptions {
            live: Some(dir.path().join("Security.jsonl")),
            sources: SourceSelection::Live,
            ..options()
        };
        assert!(matches!(check_sources(&live_only), Err(SetupError::LiveSourceMissing { .. })));

        let archives_only = RunOptions {
            archive_dir: Some(dir.path().join("nope")),
            sources: SourceSelection::Archives,
            ..options()
        };
        assert!(matches!(check_sources(&archives_only), Err(SetupError::ArchiveDirMissing { .. })));

        let archives_ignore_live = RunOptions {
            archive_dir: Some(dir.path().to_path_buf()),
            live: Some(dir.path().join("missing.jsonl")),
            sources: SourceSelection::Archives,
            ..options()
        };
        let (live, archives) = check_sources(&archives_ignore_live).unwrap();
        assert!(live.is_none());
        assert_eq!(archives, Some(dir.path()));
    }
}
