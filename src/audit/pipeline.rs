//! Run driver and per-source processing.
//!
//! A run validates its request, probes and schedules the archived segments,
//! then processes every planned source strictly one after another:
//!
//! 1. query the source with the compiled predicate
//! 2. normalize each matching record, in delivery order
//! 3. write the source's rows to its own artifact
//! 4. append them to the run's consolidated set
//!
//! Failures of a single source or artifact are reported and the run moves on.
//! Only an invalid request stops a run, and it does so before any source is
//! touched.

use crate::audit::aggregate::summarize_accounts;
use crate::audit::error::{SetupError, SourceError};
use crate::audit::export::RowSink;
use crate::audit::normalizer::{Normalizer, StatusStyle};
use crate::audit::predicate::{AccountFilter, QueryPredicate, TimeRange};
use crate::audit::probe::{probe_window, ProbeResult};
use crate::audit::scheduler::{plan_sources, PlanEntry, SourceOrder};
use crate::audit::source::EventSource;
use crate::audit::types::{
    AccountSummaryRow, AuditMode, ConsolidatedSet, EventKind, NormalizedRow, Outcome,
    SourceDescriptor, SourceKind,
};
use crate::utils::progress::ProgressBar;
use crate::utils::time::ReportZone;
use std::path::PathBuf;

/// Which authentication outcomes a run keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutcomeScope {
    #[default]
    All,
    Success,
    Failure,
}

/// What to do with status-derived events that carry no status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingStatusPolicy {
    /// Keep them whatever the outcome scope.
    #[default]
    Include,
    /// Drop them.
    Exclude,
}

/// Decides whether a normalized row is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowPolicy {
    pub scope: OutcomeScope,
    pub missing_status: MissingStatusPolicy,
}

impl RowPolicy {
    pub fn admits(&self, row: &NormalizedRow) -> bool {
        let Some(row) = row.as_auth() else {
            return true;
        };
        match (&row.outcome, self.missing_status) {
            (Outcome::Unknown, MissingStatusPolicy::Include) => true,
            (Outcome::Unknown, MissingStatusPolicy::Exclude) => false,
            (outcome, _) => match self.scope {
                OutcomeScope::All => true,
                OutcomeScope::Success => outcome.is_success(),
                OutcomeScope::Failure => outcome.is_failure(),
            },
        }
    }
}

/// Everything a run needs to know, built by the command layer.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub mode: AuditMode,
    /// Empty selects the mode's default kinds.
    pub kinds: Vec<EventKind>,
    pub range: TimeRange,
    pub accounts: AccountFilter,
    pub order: SourceOrder,
    pub status_style: StatusStyle,
    pub zone: ReportZone,
    pub row_policy: RowPolicy,
    pub write_consolidated: bool,
    pub write_summary: bool,
    /// Used in the live source tag.
    pub run_stamp: String,
}

impl AuditRequest {
    pub fn new(mode: AuditMode, range: TimeRange, run_stamp: impl Into<String>) -> Self {
        Self {
            mode,
            kinds: Vec::new(),
            range,
            accounts: AccountFilter::All,
            order: SourceOrder::default(),
            status_style: StatusStyle::default(),
            zone: ReportZone::default(),
            row_policy: RowPolicy::default(),
            write_consolidated: false,
            write_summary: false,
            run_stamp: run_stamp.into(),
        }
    }

    /// Compile the predicate, failing on any setup error.
    pub fn predicate(&self) -> Result<QueryPredicate, SetupError> {
        let kinds = if self.kinds.is_empty() {
            self.mode.default_kinds()
        } else {
            self.kinds.clone()
        };
        QueryPredicate::build(self.mode, &kinds, self.range, self.accounts.clone())
    }

    pub const fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.mode)
            .status_style(self.status_style)
            .report_zone(self.zone)
    }
}

/// How processing a source ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Exported(PathBuf),
    ExportFailed(String),
    ReadFailed(String),
}

/// Outcome of one planned source.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub tag: String,
    pub descriptor: SourceDescriptor,
    pub rows: usize,
    /// Records dropped because they could not be decoded or normalized.
    pub bad_records: usize,
    pub status: SourceStatus,
}

/// An archived source that was left out of the run.
#[derive(Debug, Clone)]
pub struct ExcludedSource {
    pub descriptor: SourceDescriptor,
    pub reason: String,
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    /// Archives skipped as unusable or outside the range.
    pub excluded: Vec<ExcludedSource>,
    pub consolidated: ConsolidatedSet,
    pub consolidated_artifact: Option<Result<PathBuf, String>>,
    pub summary: Option<Vec<AccountSummaryRow>>,
    pub summary_artifact: Option<Result<PathBuf, String>>,
}

impl RunReport {
    pub fn total_rows(&self) -> usize {
        self.consolidated.len()
    }
}

/// Tag identifying the origin of a row.
pub fn source_tag(descriptor: &SourceDescriptor, archive_index: Option<usize>, run_stamp: &str) -> String {
    match (descriptor.kind, descriptor.date_tag.as_deref(), archive_index) {
        (SourceKind::Archived, Some(date_tag), Some(index)) => format!("Archive_{}_{}", date_tag, index),
        (SourceKind::Archived, _, index) => format!("Archive_{}_{}", descriptor.file_name(), index.unwrap_or(0)),
        (SourceKind::Live, _, _) => format!("Live_{}", run_stamp),
    }
}

/// Processes planned sources into artifacts and the consolidated set.
pub struct SourceProcessor<'a> {
    predicate: &'a QueryPredicate,
    normalizer: Normalizer,
    policy: RowPolicy,
    show_progress: bool,
}

impl<'a> SourceProcessor<'a> {
    pub const fn new(predicate: &'a QueryPredicate, normalizer: Normalizer, policy: RowPolicy) -> Self {
        Self {
            predicate,
            normalizer,
            policy,
            show_progress: false,
        }
    }

    /// Show a spinner while a source is read.
    #[must_use]
    pub const fn progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn read_rows(&self, source: &dyn EventSource, tag: &str) -> Result<(Vec<NormalizedRow>, usize), SourceError> {
        let descriptor = source.descriptor();
        let file_name = descriptor.file_name();

        let stream = match source.query(self.predicate) {
            Ok(stream) => stream,
            Err(SourceError::NoMatches) => return Ok((Vec::new(), 0)),
            Err(e) => return Err(e),
        };

        let progress = self.show_progress.then(|| ProgressBar::new_spinner("Reading events"));
        let mut rows = Vec::new();
        let mut bad_records = 0;

        for record in stream {
            let record = match record {
                Ok(record) => record,
                Err(SourceError::NoMatches) => break,
                Err(e @ SourceError::BadRecord { .. }) => {
                    bad_records += 1;
                    tracing::warn!("Skipping record: {}", e);
                    continue;
                }
                Err(e) => {
                    if let Some(progress) = &progress {
                        progress.finish_and_clear();
                    }
                    return Err(e);
                }
            };
            if let Some(progress) = &progress {
                progress.inc();
            }

            match self.normalizer.normalize(&record) {
                Ok(mut row) => {
                    if self.policy.admits(&row) {
                        row.tag_source(tag, &file_name);
                        rows.push(row);
                    }
                }
                Err(e) => {
                    bad_records += 1;
                    tracing::warn!(source = %descriptor.display_id(), "Skipping record: {}", e);
                }
            }
        }

        if let Some(progress) = &progress {
            progress.finish_and_clear();
        }
        Ok((rows, bad_records))
    }

    /// Query, normalize, export, and append one source.
    pub fn process(
        &self,
        source: &dyn EventSource,
        tag: &str,
        sink: &mut dyn RowSink,
        consolidated: &mut ConsolidatedSet,
    ) -> SourceReport {
        let descriptor = source.descriptor().clone();
        let mode = self.normalizer.mode();

        let (rows, bad_records) = match self.read_rows(source, tag) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(source = %descriptor.display_id(), "Skipping source: {}", e);
                return SourceReport {
                    tag: tag.to_string(),
                    descriptor,
                    rows: 0,
                    bad_records: 0,
                    status: SourceStatus::ReadFailed(e.to_string()),
                };
            }
        };

        let status = match sink.write_source(tag, mode, &rows) {
            Ok(path) => SourceStatus::Exported(path),
            Err(e) => {
                tracing::warn!(source = %descriptor.display_id(), "Export failed: {:#}", e);
                SourceStatus::ExportFailed(format!("{:#}", e))
            }
        };

        let count = rows.len();
        consolidated.extend(rows);

        SourceReport {
            tag: tag.to_string(),
            descriptor,
            rows: count,
            bad_records,
            status,
        }
    }
}

/// Run a complete audit over `archives` and an optional `live` source.
///
/// Returns a setup error without touching any source when the request is
/// invalid. Everything after that is recovered and recorded in the report.
pub fn run_audit(
    request: &AuditRequest,
    archives: Vec<Box<dyn EventSource>>,
    live: Option<Box<dyn EventSource>>,
    sink: &mut dyn RowSink,
    show_progress: bool,
) -> Result<RunReport, SetupError> {
    let predicate = request.predicate()?;
    tracing::debug!(query = %predicate.xpath(), "Compiled query");

    let mut report = RunReport::default();

    let mut candidates = Vec::with_capacity(archives.len());
    for archive in archives {
        match probe_window(archive.as_ref()) {
            ProbeResult::Window(window) => candidates.push((window, archive)),
            ProbeResult::Unusable(e) => {
                tracing::warn!(source = %archive.descriptor().display_id(), "Archive unusable: {}", e);
                report.excluded.push(ExcludedSource {
                    descriptor: archive.descriptor().clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let probed: Vec<SourceDescriptor> = candidates
        .iter()
        .map(|(window, source)| SourceDescriptor {
            window: Some(*window),
            ..source.descriptor().clone()
        })
        .collect();

    let plan = plan_sources(candidates, live, predicate.range(), request.order);

    let scheduled: Vec<&std::path::Path> = plan
        .iter()
        .filter_map(|entry| match entry {
            PlanEntry::Archive { source, .. } => Some(source.descriptor().path.as_path()),
            PlanEntry::Live(_) => None,
        })
        .collect();
    for descriptor in &probed {
        if !scheduled.contains(&descriptor.path.as_path()) {
            let window = descriptor.window.map(|w| w.to_string()).unwrap_or_default();
            tracing::info!(source = %descriptor.display_id(), "Archive outside requested range ({})", window);
            report.excluded.push(ExcludedSource {
                descriptor: descriptor.clone(),
                reason: format!("window {} outside requested range", window),
            });
        }
    }

    let processor = SourceProcessor::new(&predicate, request.normalizer(), request.row_policy)
        .progress(show_progress);
    let total = plan.len();

    for (i, entry) in plan.iter().enumerate() {
        let (source, tag) = match entry {
            PlanEntry::Live(source) => (source, source_tag(source.descriptor(), None, &request.run_stamp)),
            PlanEntry::Archive { index, source, .. } => {
                (source, source_tag(source.descriptor(), Some(*index), &request.run_stamp))
            }
        };

        if show_progress {
            eprintln!("[{}/{}] Processing: {}", i + 1, total, source.descriptor().display_id());
        }

        let mut source_report = processor.process(source.as_ref(), &tag, sink, &mut report.consolidated);
        if let PlanEntry::Archive { window, .. } = entry {
            source_report.descriptor.window = Some(*window);
        }
        report.sources.push(source_report);
    }

    if request.write_consolidated {
        let result = sink
            .write_consolidated(request.mode, &report.consolidated)
            .map_err(|e| format!("{:#}", e));
        if let Err(e) = &result {
            tracing::warn!("Consolidated export failed: {}", e);
        }
        report.consolidated_artifact = Some(result);
    }

    if request.write_summary && request.mode == AuditMode::Authentication {
        let summary = summarize_accounts(&report.consolidated, &request.accounts);
        let result = sink.write_summary(&summary).map_err(|e| format!("{:#}", e));
        if let Err(e) = &result {
            tracing::warn!("Summary export failed: {}", e);
        }
        report.summary_artifact = Some(result);
        report.summary = Some(summary);
    }

    Ok(report)
}
