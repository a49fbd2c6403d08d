//! Window probing for archived segments.
//!
//! Only the first and last record of a segment are read. Their dates (UTC
//! calendar days, not full timestamps) bound the window the scheduler uses to
//! decide whether the segment can contain events of interest.

use crate::audit::error::SourceError;
use crate::audit::source::EventSource;
use crate::audit::types::{DayWindow, RawEventRecord};
use crate::utils::time::parse_timestamp;
use chrono::NaiveDate;

/// Result of probing one archived source.
#[derive(Debug)]
pub enum ProbeResult {
    Window(DayWindow),
    /// The source is empty or could not be read; it is left out of the run.
    Unusable(SourceError),
}

fn record_date(source_id: &str, record: &RawEventRecord) -> Result<NaiveDate, SourceError> {
    let ts = record
        .time_created
        .as_deref()
        .ok_or_else(|| SourceError::read(source_id, "boundary record has no TimeCreated"))?;
    parse_timestamp(ts)
        .map(|dt| dt.date_naive())
        .map_err(|e| SourceError::read(source_id, format!("{:#}", e)))
}

/// Determine the day window of `source` from its boundary records.
pub fn probe_window(source: &dyn EventSource) -> ProbeResult {
    let id = source.descriptor().display_id();
    let window = source.boundaries().and_then(|(first, last)| {
        let first = record_date(&id, &first)?;
        let last = record_date(&id, &last)?;
        Ok(DayWindow::from_boundaries(first, last))
    });

    match window {
        Ok(window) => ProbeResult::Window(window),
        Err(e) => ProbeResult::Unusable(e),
    }
}
