use anyhow::{anyhow, Context, Result};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an event `TimeCreated` value.
///
/// RFC 3339 text is converted to UTC. Text without an offset is taken as UTC.
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(ts, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow!("Failed to parse timestamp: {}", ts))
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {}", input))
}

/// Midnight UTC at the start of `day`.
pub fn day_start_utc(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-10-02T08:15:00.000Z`.
pub fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamp used in artifact names and live source tags.
pub fn run_stamp(dt: &DateTime<Local>) -> String {
    dt.format("%Y%m%d_%H%M%S").to_string()
}

/// One or two ASCII digits; signs are not allowed inside an offset.
fn offset_part(part: &str) -> Option<i32> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Zone used for wall-clock timestamps in lifecycle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl ReportZone {
    /// Parse `+HH:MM`, `-HH:MM`, or `Z`.
    pub fn parse_offset(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("z") || input.eq_ignore_ascii_case("utc") {
            return FixedOffset::east_opt(0).map(Self::Fixed);
        }
        let (sign, rest) = match input.as_bytes().first()? {
            b'+' => (1, &input[1..]),
            b'-' => (-1, &input[1..]),
            _ => return None,
        };
        let (hours, minutes) = rest.split_once(':')?;
        let hours = offset_part(hours)?;
        let minutes = offset_part(minutes)?;
        if hours > 23 || minutes > 59 {
            return None;
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).map(Self::Fixed)
    }

    /// `yyyy-MM-dd HH:mm:ss` wall-clock time in this zone.
    pub fn format_wall_clock(&self, dt: &DateTime<Utc>) -> String {
        const FMT: &str = "%Y-%m-%d %H:%M:%S";
        match self {
            Self::Local => dt.with_timezone(&Local).format(FMT).to_string(),
            Self::Fixed(offset) => offset.from_utc_datetime(&dt.naive_utc()).format(FMT).to_string(),
        }
    }
}
