use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Simple "YYYY-MM" bucket with ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8, // 1..=12
}

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Self {
        assert!((1..=12).contains(&month), "Month must be 1..=12");
        Self { year, month }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split('-').collect();
        if parts.len() != 2 {
            return Err("expected YYYY-MM".into());
        }
        let year: u16 = parts[0].parse().map_err(|_| "invalid year")?;
        let month: u8 = parts[1].parse().map_err(|_| "invalid month")?;
        if !(1..=12).contains(&month) {
            return Err("month must be 01..12".into());
        }
        Ok(Self { year, month })
    }
}

// Used as a JSON map key in reports, so always a plain string.
impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse().map_err(serde::de::Error::custom)
    }
}

/// Calendar columns derived from `created_utc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: u16,
    pub month: u8,
    pub day: Date,
    pub year_month: YearMonth,
}

impl CalendarFields {
    pub fn from_datetime(dt: PrimitiveDateTime) -> Option<Self> {
        let year = u16::try_from(dt.year()).ok()?;
        let month = u8::from(dt.month());
        Some(Self { year, month, day: dt.date(), year_month: YearMonth { year, month } })
    }

    /// `YYYY-MM-DD`
    pub fn day_string(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day.day())
    }
}

/// Parse a stored `created_utc` value. Accepts the collector's own
/// `YYYY-MM-DD HH:MM:SS` (optionally with fractional seconds), ISO `T`
/// separated forms, RFC 3339 with an offset (converted to UTC), and bare dates.
/// Anything else is `None`; callers drop such rows.
pub fn parse_created_utc(raw: &str) -> Option<PrimitiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let space = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let space_frac = format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
    let iso = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let date_only = format_description!("[year]-[month]-[day]");

    if let Ok(dt) = PrimitiveDateTime::parse(s, &space) {
        return Some(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(s, &space_frac) {
        return Some(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(s, &iso) {
        return Some(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        let utc = dt.to_offset(UtcOffset::UTC);
        return Some(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    if let Ok(d) = Date::parse(s, &date_only) {
        return Some(d.midnight());
    }
    None
}

/// Format an API epoch (seconds, possibly fractional) as `YYYY-MM-DD HH:MM:SS` UTC.
pub fn format_epoch_utc(epoch_secs: f64) -> Option<String> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let dt = OffsetDateTime::from_unix_timestamp(epoch_secs.trunc() as i64).ok()?;
    dt.format(&format_description!("[year]-[month]-[day] [hour]:[minute]:[second]")).ok()
}
