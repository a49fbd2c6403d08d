//! Data structures for security event records and the rows derived from them.
//!
//! Raw records mirror the JSON-lines export of the security log
//! (`EventID`, `TimeCreated`, `EventData`). Normalized rows are the fixed-shape
//! records written to CSV, one shape per [`AuditMode`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which family of events a run audits. Determines the row shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditMode {
    Authentication,
    Lifecycle,
}

impl AuditMode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Lifecycle => "lifecycle",
        }
    }

    /// Prefix used for artifact file names.
    pub const fn artifact_prefix(self) -> &'static str {
        match self {
            Self::Authentication => "auth",
            Self::Lifecycle => "lifecycle",
        }
    }

    /// CSV header, in export column order.
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Authentication => &[
                "TimestampUTC",
                "EventID",
                "EventName",
                "Account",
                "ClientAddress",
                "Workstation",
                "LogonType",
                "Status",
                "Source",
                "SourceFile",
            ],
            Self::Lifecycle => &[
                "Timestamp",
                "EventID",
                "Action",
                "TargetAccount",
                "ActorAccount",
                "Source",
            ],
        }
    }

    /// Kinds selected when the caller does not name any.
    pub fn default_kinds(self) -> Vec<EventKind> {
        match self {
            Self::Authentication => vec![
                EventKind::TicketGranted,
                EventKind::PreAuthFailed,
                EventKind::CredentialValidation,
            ],
            Self::Lifecycle => vec![
                EventKind::AccountCreated,
                EventKind::AccountEnabled,
                EventKind::AccountDisabled,
                EventKind::AccountDeleted,
            ],
        }
    }
}

impl fmt::Display for AuditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the outcome of an event is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeRule {
    /// The event only exists when the operation succeeded.
    AlwaysSuccess,
    /// The event only exists when the operation failed.
    AlwaysFailure,
    /// Success or failure is read from the status field.
    FromStatus,
    /// Account lifecycle action; no success/failure concept.
    Lifecycle(&'static str),
}

/// Audited security event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// 4768 - Kerberos authentication ticket (TGT) requested
    TicketGranted,
    /// 4771 - Kerberos pre-authentication failed
    PreAuthFailed,
    /// 4776 - NTLM credential validation
    CredentialValidation,
    /// 4624
    LogonSuccess,
    /// 4625
    LogonFailure,
    /// 4720
    AccountCreated,
    /// 4722
    AccountEnabled,
    /// 4725
    AccountDisabled,
    /// 4726
    AccountDeleted,
    /// 4740
    AccountLockedOut,
    /// 4767
    AccountUnlocked,
}

impl EventKind {
    pub const ALL: [Self; 11] = [
        Self::TicketGranted,
        Self::PreAuthFailed,
        Self::CredentialValidation,
        Self::LogonSuccess,
        Self::LogonFailure,
        Self::AccountCreated,
        Self::AccountEnabled,
        Self::AccountDisabled,
        Self::AccountDeleted,
        Self::AccountLockedOut,
        Self::AccountUnlocked,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub const fn id(self) -> u32 {
        match self {
            Self::TicketGranted => 4768,
            Self::PreAuthFailed => 4771,
            Self::CredentialValidation => 4776,
            Self::LogonSuccess => 4624,
            Self::LogonFailure => 4625,
            Self::AccountCreated => 4720,
            Self::AccountEnabled => 4722,
            Self::AccountDisabled => 4725,
            Self::AccountDeleted => 4726,
            Self::AccountLockedOut => 4740,
            Self::AccountUnlocked => 4767,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::TicketGranted => "Kerberos TGT requested",
            Self::PreAuthFailed => "Kerberos pre-authentication failed",
            Self::CredentialValidation => "NTLM credential validation",
            Self::LogonSuccess => "Successful logon",
            Self::LogonFailure => "Failed logon",
            Self::AccountCreated => "Account created",
            Self::AccountEnabled => "Account enabled",
            Self::AccountDisabled => "Account disabled",
            Self::AccountDeleted => "Account deleted",
            Self::AccountLockedOut => "Account locked out",
            Self::AccountUnlocked => "Account unlocked",
        }
    }

    pub const fn rule(self) -> OutcomeRule {
        match self {
            Self::TicketGranted | Self::LogonSuccess => OutcomeRule::AlwaysSuccess,
            Self::PreAuthFailed | Self::LogonFailure => OutcomeRule::AlwaysFailure,
            Self::CredentialValidation => OutcomeRule::FromStatus,
            Self::AccountCreated => OutcomeRule::Lifecycle("Created"),
            Self::AccountEnabled => OutcomeRule::Lifecycle("Enabled"),
            Self::AccountDisabled => OutcomeRule::Lifecycle("Disabled"),
            Self::AccountDeleted => OutcomeRule::Lifecycle("Deleted"),
            Self::AccountLockedOut => OutcomeRule::Lifecycle("Locked out"),
            Self::AccountUnlocked => OutcomeRule::Lifecycle("Unlocked"),
        }
    }

    pub const fn mode(self) -> AuditMode {
        match self.rule() {
            OutcomeRule::Lifecycle(_) => AuditMode::Lifecycle,
            _ => AuditMode::Authentication,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.name())
    }
}

/// One line of a JSON-lines security event export.
#[derive(Debug, Clone, Deserialize)]
pub struct EventLine {
    #[serde(rename = "EventID")]
    pub event_id: Option<serde_json::Value>,
    #[serde(rename = "TimeCreated")]
    pub time_created: Option<String>,
    #[serde(rename = "EventData", default)]
    pub event_data: BTreeMap<String, serde_json::Value>,
}

/// A record as delivered by a source, before normalization.
///
/// Every part may be missing; the normalizer decides what is fatal for the
/// record and what is merely an empty column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEventRecord {
    pub event_id: Option<u32>,
    pub time_created: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl RawEventRecord {
    pub fn new(event_id: u32, time_created: &str) -> Self {
        Self {
            event_id: Some(event_id),
            time_created: Some(time_created.to_string()),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl From<EventLine> for RawEventRecord {
    fn from(line: EventLine) -> Self {
        // EventID shows up both as a number and as a quoted number
        let event_id = match line.event_id {
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        let fields = line
            .event_data
            .into_iter()
            .filter_map(|(name, value)| {
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((name, text))
            })
            .collect();

        Self {
            event_id,
            time_created: line.time_created,
            fields,
        }
    }
}

/// Evaluated result of an authentication event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Failure with the failure code as recorded, if any.
    Failure(Option<String>),
    /// Status-derived kind whose status field was absent.
    Unknown,
}

impl Outcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Authentication-mode row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRow {
    #[serde(rename = "TimestampUTC")]
    pub timestamp_utc: String,
    #[serde(rename = "EventID")]
    pub event_id: u32,
    #[serde(rename = "EventName")]
    pub event_name: String,
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "ClientAddress")]
    pub client_address: String,
    #[serde(rename = "Workstation")]
    pub workstation: String,
    #[serde(rename = "LogonType")]
    pub logon_type: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "SourceFile")]
    pub source_file: String,
    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub outcome: Outcome,
}

/// Account-lifecycle-mode row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "EventID")]
    pub event_id: u32,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "TargetAccount")]
    pub target_account: String,
    #[serde(rename = "ActorAccount")]
    pub actor_account: String,
    #[serde(rename = "Source")]
    pub source: String,
}

/// A normalized row of either shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedRow {
    Auth(AuthRow),
    Lifecycle(LifecycleRow),
}

impl NormalizedRow {
    pub const fn mode(&self) -> AuditMode {
        match self {
            Self::Auth(_) => AuditMode::Authentication,
            Self::Lifecycle(_) => AuditMode::Lifecycle,
        }
    }

    pub const fn event_id(&self) -> u32 {
        match self {
            Self::Auth(row) => row.event_id,
            Self::Lifecycle(row) => row.event_id,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Auth(row) => &row.source,
            Self::Lifecycle(row) => &row.source,
        }
    }

    pub const fn as_auth(&self) -> Option<&AuthRow> {
        match self {
            Self::Auth(row) => Some(row),
            Self::Lifecycle(_) => None,
        }
    }

    /// Stamp the origin of the row. Called once, before the row is published.
    pub(crate) fn tag_source(&mut self, tag: &str, file_name: &str) {
        match self {
            Self::Auth(row) => {
                row.source = tag.to_string();
                row.source_file = file_name.to_string();
            }
            Self::Lifecycle(row) => row.source = tag.to_string(),
        }
    }
}

/// Every row of a run, in processing order.
pub type ConsolidatedSet = Vec<NormalizedRow>;

/// Per-account rollup of authentication rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummaryRow {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "SuccessCount")]
    pub success_count: usize,
    #[serde(rename = "FailCount")]
    pub fail_count: usize,
    #[serde(rename = "LastSeenTimestampUTC")]
    pub last_seen_timestamp_utc: Option<String>,
    #[serde(rename = "LastSeenEventID")]
    pub last_seen_event_id: Option<u32>,
    #[serde(rename = "LastSeenStatus")]
    pub last_seen_status: Option<String>,
}

impl AccountSummaryRow {
    pub const COLUMNS: [&'static str; 6] = [
        "Account",
        "SuccessCount",
        "FailCount",
        "LastSeenTimestampUTC",
        "LastSeenEventID",
        "LastSeenStatus",
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Archived,
}

/// Inclusive range of UTC calendar dates covered by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DayWindow {
    /// Build a window from two boundary dates in either order.
    pub fn from_boundaries(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            min: first.min(last),
            max: first.max(last),
        }
    }
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.min, self.max)
    }
}

/// Identity of a live log or an archived segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// `YYYY-MM-DD-HH-MM-SS-fff` part of an archive name.
    pub date_tag: Option<String>,
    pub window: Option<DayWindow>,
}

impl SourceDescriptor {
    pub fn live(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Live,
            date_tag: None,
            window: None,
        }
    }

    pub fn archived(path: impl Into<PathBuf>, date_tag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Archived,
            date_tag: Some(date_tag.into()),
            window: None,
        }
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    pub fn display_id(&self) -> String {
        self.path.display().to_string()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}
