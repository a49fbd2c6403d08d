//! Event sources: the live log and archived log segments.
//!
//! The pipeline only talks to sources through [`EventSource`]. The crate ships
//! [`JsonLinesSource`], which reads security events exported as JSON lines
//! (optionally `.gz`/`.zst` compressed), and [`discover_archives`], which
//! turns a directory listing into archived source descriptors.
//!
//! Archived segments must follow the strict naming pattern
//! `Archive-Security-YYYY-MM-DD-HH-MM-SS-fff.<ext>`; anything else in the
//! archive directory is ignored.

use crate::audit::error::SourceError;
use crate::audit::predicate::QueryPredicate;
use crate::audit::types::{EventLine, RawEventRecord, SourceDescriptor};
use crate::utils::reader::{first_line, last_line, open_file};
use crate::utils::time::parse_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

/// Lazy, forward-only sequence of matching records.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<RawEventRecord, SourceError>> + 'a>;

/// A queryable event log.
pub trait EventSource {
    fn descriptor(&self) -> &SourceDescriptor;

    /// Run `predicate` against the source.
    ///
    /// Implementations may return [`SourceError::NoMatches`] instead of an
    /// empty stream when nothing matches. Items that are
    /// [`SourceError::BadRecord`] concern a single record; any other error
    /// item ends the stream.
    fn query<'a>(&'a self, predicate: &'a QueryPredicate) -> Result<RecordStream<'a>, SourceError>;

    /// Oldest and newest record, read without scanning the whole source.
    fn boundaries(&self) -> Result<(RawEventRecord, RawEventRecord), SourceError>;
}

fn archive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^Archive-Security-(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}-\d{3})\.[A-Za-z0-9]+(?:\.(?:gz|zst))?$",
        )
        .expect("archive name pattern is valid")
    })
}

/// Date tag (`YYYY-MM-DD-HH-MM-SS-fff`) of a strictly named archive, or
/// `None` when the name does not match or encodes an impossible date.
pub fn parse_archive_name(file_name: &str) -> Option<String> {
    let captures = archive_pattern().captures(file_name)?;
    let tag = captures.get(1)?.as_str();

    let (date_time, millis) = tag.rsplit_once('-')?;
    NaiveDateTime::parse_from_str(date_time, "%Y-%m-%d-%H-%M-%S").ok()?;
    millis.parse::<u16>().ok()?;

    Some(tag.to_string())
}

/// List the strictly named archives in `dir`, sorted by file name.
pub fn discover_archives(dir: impl AsRef<Path>) -> Result<Vec<SourceDescriptor>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list archive directory: {}", dir.display()))?;

    let mut archives: Vec<SourceDescriptor> = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(tag) = parse_archive_name(&name) {
            archives.push(SourceDescriptor::archived(entry.path(), tag));
        }
    }

    archives.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(archives)
}

/// True when the record has a kind and a parseable timestamp.
fn is_well_formed(record: &RawEventRecord) -> bool {
    record.event_id.is_some()
        && record
            .time_created
            .as_deref()
            .is_some_and(|ts| parse_timestamp(ts).is_ok())
}

/// Security events exported as one JSON object per line.
///
/// Blank lines and records that fail the predicate are skipped. A line that is
/// not UTF-8 or not a JSON event yields [`SourceError::BadRecord`], and a record
/// without a usable `EventID` or `TimeCreated` is passed through unfiltered so
/// the normalizer rejects it. Only I/O failures end the stream, with
/// [`SourceError::Read`].
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    descriptor: SourceDescriptor,
}

impl JsonLinesSource {
    pub const fn new(descriptor: SourceDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn path(&self) -> &Path {
        &self.descriptor.path
    }

    fn parse_line(&self, line: Option<String>, which: &str) -> Result<RawEventRecord, SourceError> {
        let id = self.descriptor.display_id();
        let line = line.ok_or_else(|| SourceError::Empty {
            source_id: id.clone(),
        })?;
        let parsed: EventLine = serde_json::from_str(&line)
            .map_err(|e| SourceError::read(id, format!("{} record is not valid JSON: {}", which, e)))?;
        Ok(parsed.into())
    }
}

impl EventSource for JsonLinesSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn query<'a>(&'a self, predicate: &'a QueryPredicate) -> Result<RecordStream<'a>, SourceError> {
        let id = self.descriptor.display_id();
        let reader = open_file(&self.descriptor.path).map_err(|e| SourceError::read(&id, format!("{:#}", e)))?;
        let lines = BufReader::new(reader).split(b'\n');

        let mut failed = false;
        let stream = lines.enumerate().filter_map(move |(i, line)| {
            if failed {
                return None;
            }
            let line_no = i + 1;
            let bytes = match line {
                Ok(bytes) => bytes,
                Err(e) => {
                    failed = true;
                    return Some(Err(SourceError::read(&id, e)));
                }
            };
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => return Some(Err(SourceError::bad_record(&id, line_no, e))),
            };
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let record = match serde_json::from_str::<EventLine>(text) {
                Ok(parsed) => RawEventRecord::from(parsed),
                Err(e) => {
                    return Some(Err(SourceError::bad_record(&id, line_no, format!("not a JSON event: {}", e))));
                }
            };
            if !is_well_formed(&record) {
                return Some(Ok(record));
            }
            predicate.matches(&record).then_some(Ok(record))
        });

        Ok(Box::new(stream))
    }

    fn boundaries(&self) -> Result<(RawEventRecord, RawEventRecord), SourceError> {
        let id = self.descriptor.display_id();
        let first = first_line(&self.descriptor.path).map_err(|e| SourceError::read(&id, format!("{:#}", e)))?;
        let last = last_line(&self.descriptor.path).map_err(|e| SourceError::read(&id, format!("{:#}", e)))?;
        Ok((self.parse_line(first, "first")?, self.parse_line(last, "last")?))
    }
}
