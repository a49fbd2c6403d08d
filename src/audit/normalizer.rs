//! Field normalization for raw security events.
//!
//! Different event kinds, and different producers of the same kind, put the
//! same logical value under different field names. Each logical column is
//! therefore resolved from an ordered list of candidate field names: the first
//! present, non-blank value wins. A column with no candidate present is left
//! empty; that is never an error.
//!
//! The outcome of authentication events follows the kind's [`OutcomeRule`].
//! Legacy (NTLM) validation is the only kind whose outcome comes from the
//! record itself: status `0x0` means success, anything else is a failure code.

use crate::audit::error::NormalizeError;
use crate::audit::types::{
    AuditMode, AuthRow, EventKind, LifecycleRow, NormalizedRow, Outcome, OutcomeRule,
    RawEventRecord,
};
use crate::utils::time::{format_utc, parse_timestamp, ReportZone};

/// Candidate field names for the authenticated account.
pub const AUTH_ACCOUNT_FIELDS: &[&str] = &["TargetUserName", "AccountName", "TargetSid"];
pub const CLIENT_ADDRESS_FIELDS: &[&str] = &["IpAddress", "ClientAddress", "SourceNetworkAddress"];
pub const WORKSTATION_FIELDS: &[&str] = &["Workstation", "WorkstationName", "ClientName"];
pub const LOGON_TYPE_FIELDS: &[&str] = &["LogonType"];
pub const STATUS_FIELDS: &[&str] = &["Status", "FailureCode"];
/// Candidate field names for the account acted upon by a lifecycle event.
pub const TARGET_ACCOUNT_FIELDS: &[&str] = &["TargetUserName", "SamAccountName", "TargetSid"];
pub const ACTOR_ACCOUNT_FIELDS: &[&str] = &["SubjectUserName", "SubjectUserSid"];

pub const SUCCESS_STATUS: &str = "SUCCESS";
pub const FAILED_STATUS: &str = "FAILED";

/// Kerberos and NTLM status codes with a readable meaning.
const STATUS_DESCRIPTIONS: &[(&str, &str)] = &[
    ("0x6", "Client not found in Kerberos database"),
    ("0x12", "Client credentials revoked (disabled, expired or locked out)"),
    ("0x17", "Password has expired"),
    ("0x18", "Pre-authentication failed (bad password)"),
    ("0x25", "Clock skew too great"),
    ("0xc0000064", "User name does not exist"),
    ("0xc000006a", "Bad password"),
    ("0xc000006f", "Logon outside allowed hours"),
    ("0xc0000070", "Workstation restriction"),
    ("0xc0000071", "Password expired"),
    ("0xc0000072", "Account disabled"),
    ("0xc0000193", "Account expired"),
    ("0xc0000224", "Password must change at next logon"),
    ("0xc0000234", "Account locked out"),
];

/// How failure codes are rendered in the `Status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusStyle {
    /// Codes exactly as recorded.
    #[default]
    Raw,
    /// Codes translated through the status table.
    Described,
}

/// Resolve the first present, non-blank field among `candidates`.
pub fn resolve_field<'a>(record: &'a RawEventRecord, candidates: &[&str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|name| record.field(name))
        .find(|value| !value.trim().is_empty())
}

fn resolve_or_empty(record: &RawEventRecord, candidates: &[&str]) -> String {
    resolve_field(record, candidates)
        .unwrap_or_default()
        .to_string()
}

/// Human-readable text for a status code, `Unknown(<code>)` when unmapped.
pub fn describe_status(code: &str) -> String {
    let key = code.trim().to_ascii_lowercase();
    STATUS_DESCRIPTIONS
        .iter()
        .find(|(known, _)| *known == key)
        .map_or_else(|| format!("Unknown({})", code.trim()), |(_, text)| (*text).to_string())
}

/// Evaluate the outcome of an authentication event.
pub fn evaluate_outcome(rule: OutcomeRule, record: &RawEventRecord) -> Option<Outcome> {
    let status = resolve_field(record, STATUS_FIELDS);
    match rule {
        OutcomeRule::AlwaysSuccess => Some(Outcome::Success),
        OutcomeRule::AlwaysFailure => Some(Outcome::Failure(status.map(str::to_string))),
        OutcomeRule::FromStatus => Some(match status {
            Some(code) if code.trim().eq_ignore_ascii_case("0x0") => Outcome::Success,
            Some(code) => Outcome::Failure(Some(code.to_string())),
            None => Outcome::Unknown,
        }),
        OutcomeRule::Lifecycle(_) => None,
    }
}

/// Render an outcome for the `Status` column.
pub fn render_status(outcome: &Outcome, style: StatusStyle) -> String {
    match outcome {
        Outcome::Success => SUCCESS_STATUS.to_string(),
        Outcome::Failure(None) => FAILED_STATUS.to_string(),
        Outcome::Failure(Some(code)) => match style {
            StatusStyle::Raw => code.clone(),
            StatusStyle::Described => describe_status(code),
        },
        Outcome::Unknown => String::new(),
    }
}

/// Converts raw records into rows of one [`AuditMode`].
///
/// Rows come out with empty `Source`/`SourceFile`; the per-source processor
/// tags them.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    mode: AuditMode,
    status_style: StatusStyle,
    zone: ReportZone,
}

impl Normalizer {
    pub const fn new(mode: AuditMode) -> Self {
        Self {
            mode,
            status_style: StatusStyle::Raw,
            zone: ReportZone::Local,
        }
    }

    #[must_use]
    pub const fn status_style(mut self, style: StatusStyle) -> Self {
        self.status_style = style;
        self
    }

    /// Zone for lifecycle wall-clock timestamps.
    #[must_use]
    pub const fn report_zone(mut self, zone: ReportZone) -> Self {
        self.zone = zone;
        self
    }

    pub const fn mode(&self) -> AuditMode {
        self.mode
    }

    pub fn normalize(&self, record: &RawEventRecord) -> Result<NormalizedRow, NormalizeError> {
        let id = record.event_id.ok_or(NormalizeError::MissingKind)?;
        let kind = EventKind::from_id(id)
            .filter(|kind| kind.mode() == self.mode)
            .ok_or(NormalizeError::UnknownKind(id))?;

        let raw_ts = record
            .time_created
            .as_deref()
            .filter(|ts| !ts.trim().is_empty())
            .ok_or(NormalizeError::MissingTimestamp)?;
        let timestamp = parse_timestamp(raw_ts)
            .map_err(|_| NormalizeError::MalformedTimestamp(raw_ts.to_string()))?;

        let row = match kind.rule() {
            OutcomeRule::Lifecycle(action) => NormalizedRow::Lifecycle(LifecycleRow {
                timestamp: self.zone.format_wall_clock(&timestamp),
                event_id: id,
                action: action.to_string(),
                target_account: resolve_or_empty(record, TARGET_ACCOUNT_FIELDS),
                actor_account: resolve_or_empty(record, ACTOR_ACCOUNT_FIELDS),
                source: String::new(),
            }),
            rule => {
                let outcome = evaluate_outcome(rule, record).unwrap_or(Outcome::Unknown);
                NormalizedRow::Auth(AuthRow {
                    timestamp_utc: format_utc(&timestamp),
                    event_id: id,
                    event_name: kind.name().to_string(),
                    account: resolve_or_empty(record, AUTH_ACCOUNT_FIELDS),
                    client_address: resolve_or_empty(record, CLIENT_ADDRESS_FIELDS),
                    workstation: resolve_or_empty(record, WORKSTATION_FIELDS),
                    logon_type: resolve_or_empty(record, LOGON_TYPE_FIELDS),
                    status: render_status(&outcome, self.status_style),
                    source: String::new(),
                    source_file: String::new(),
                    timestamp,
                    outcome,
                })
            }
        };

        Ok(row)
    }
}
