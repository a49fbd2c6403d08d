//! Query predicate construction.
//!
//! A [`QueryPredicate`] combines the selected event kinds, the requested
//! calendar-day range, and an optional account list. It renders to the
//! XPath dialect understood by the event-log query API and can also be
//! evaluated in-process against a [`RawEventRecord`], which is how the
//! file-backed sources in [`crate::audit::source`] push the filter down.
//!
//! # Example
//!
//! ```
//! use seclog_audit_tools::audit::predicate::{AccountFilter, QueryPredicate, TimeRange};
//! use seclog_audit_tools::audit::types::{AuditMode, EventKind};
//!
//! let range = TimeRange::parse("2025-10-01", "2025-10-01").unwrap();
//! let predicate = QueryPredicate::build(
//!     AuditMode::Authentication,
//!     &[EventKind::TicketGranted],
//!     range,
//!     AccountFilter::All,
//! )
//! .unwrap();
//! assert!(predicate.xpath().contains("EventID=4768"));
//! ```

use crate::audit::error::SetupError;
use crate::audit::normalizer::{AUTH_ACCOUNT_FIELDS, TARGET_ACCOUNT_FIELDS};
use crate::audit::types::{AuditMode, EventKind, RawEventRecord};
use crate::utils::time::{day_start_utc, format_utc, parse_day, parse_timestamp};
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashSet;

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SetupError> {
        if start > end {
            return Err(SetupError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self, SetupError> {
        let parse = |input: &str| {
            parse_day(input).map_err(|_| SetupError::InvalidDate {
                input: input.to_string(),
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// First instant of the range.
    pub fn start_instant(&self) -> DateTime<Utc> {
        day_start_utc(self.start)
    }

    /// First instant after the range (exclusive bound covering the whole end day).
    pub fn end_instant(&self) -> DateTime<Utc> {
        let next = self.end.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        day_start_utc(next)
    }

    pub fn contains_instant(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start_instant() && *ts < self.end_instant()
    }
}

/// Which accounts a run is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    All,
    /// Non-empty, de-duplicated, trimmed names in first-seen order.
    Only(Vec<String>),
}

impl AccountFilter {
    /// Clean a list of names. Blank entries are dropped and duplicates
    /// collapsed (case-sensitive); nothing left is an error.
    pub fn from_names<I, S>(names: I) -> Result<Self, SetupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let cleaned: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.clone()))
            .collect();

        if cleaned.is_empty() {
            return Err(SetupError::EmptyAccountList);
        }
        Ok(Self::Only(cleaned))
    }

    pub fn names(&self) -> &[String] {
        match self {
            Self::All => &[],
            Self::Only(names) => names,
        }
    }

    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Replace single quotes so a literal can sit inside a quote-delimited XPath string.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "&apos;")
}

/// Compiled kind + time + account filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    kinds: Vec<EventKind>,
    range: TimeRange,
    accounts: AccountFilter,
    account_fields: [&'static str; 2],
    xpath: String,
}

impl QueryPredicate {
    /// Validate the inputs and compile the predicate.
    ///
    /// Duplicate kinds are collapsed; kinds must all belong to `mode`.
    pub fn build(
        mode: AuditMode,
        kinds: &[EventKind],
        range: TimeRange,
        accounts: AccountFilter,
    ) -> Result<Self, SetupError> {
        let mut unique: Vec<EventKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if kind.mode() != mode {
                return Err(SetupError::KindModeMismatch {
                    id: kind.id(),
                    mode: mode.name(),
                });
            }
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        if unique.is_empty() {
            return Err(SetupError::NoEventKinds);
        }

        let candidates = match mode {
            AuditMode::Authentication => AUTH_ACCOUNT_FIELDS,
            AuditMode::Lifecycle => TARGET_ACCOUNT_FIELDS,
        };
        let account_fields = [candidates[0], candidates[1]];
        let xpath = render_xpath(&unique, &range, &accounts, &account_fields);

        Ok(Self {
            kinds: unique,
            range,
            accounts,
            account_fields,
            xpath,
        })
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub const fn range(&self) -> &TimeRange {
        &self.range
    }

    pub const fn accounts(&self) -> &AccountFilter {
        &self.accounts
    }

    /// The predicate in event-log XPath form.
    pub fn xpath(&self) -> &str {
        &self.xpath
    }

    /// Evaluate the predicate against a record.
    ///
    /// Account literals are compared unescaped and case-sensitively. A record
    /// whose timestamp cannot be parsed falls outside every time range.
    pub fn matches(&self, record: &RawEventRecord) -> bool {
        let Some(id) = record.event_id else {
            return false;
        };
        if !self.kinds.iter().any(|kind| kind.id() == id) {
            return false;
        }

        let in_range = record
            .time_created
            .as_deref()
            .and_then(|ts| parse_timestamp(ts).ok())
            .is_some_and(|ts| self.range.contains_instant(&ts));
        if !in_range {
            return false;
        }

        match &self.accounts {
            AccountFilter::All => true,
            AccountFilter::Only(names) => self.account_fields.iter().any(|field| {
                record
                    .field(field)
                    .is_some_and(|value| names.iter().any(|name| name == value))
            }),
        }
    }
}

fn render_xpath(
    kinds: &[EventKind],
    range: &TimeRange,
    accounts: &AccountFilter,
    account_fields: &[&str; 2],
) -> String {
    let kind_clause = kinds
        .iter()
        .map(|kind| format!("EventID={}", kind.id()))
        .collect::<Vec<_>>()
        .join(" or ");

    let mut xpath = format!(
        "*[System[({}) and TimeCreated[@SystemTime>='{}' and @SystemTime<'{}']]]",
        kind_clause,
        format_utc(&range.start_instant()),
        format_utc(&range.end_instant()),
    );

    if let AccountFilter::Only(names) = accounts {
        let account_clause = names
            .iter()
            .flat_map(|name| {
                let literal = escape_literal(name);
                account_fields
                    .iter()
                    .map(move |field| format!("Data[@Name='{}']='{}'", field, literal))
            })
            .collect::<Vec<_>>()
            .join(" or ");
        xpath.push_str(&format!(" and *[EventData[({})]]", account_clause));
    }

    xpath
}
