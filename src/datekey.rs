use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Offset of the reporting time zone (UTC+5:30) in seconds
pub const REPORTING_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Separator used between date and time in composite timestamps
pub const BULLET: char = '•';

lazy_static! {
    static ref NUMERIC_DATE_REGEX: Regex =
        Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{4})").unwrap();
    static ref ZONE_COMMENT_REGEX: Regex = Regex::new(r"\s*\([^)]*\)\s*$").unwrap();
}

// Formats carrying an explicit offset
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M %z",
    "%A %B %d %Y %H:%M:%S GMT%z",
    "%B %d, %Y %H:%M:%S %z",
];

// Date and time without a zone, read as reporting-zone wall clock
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%d %B %Y %I:%M %p",
    "%A %B %d %Y %H:%M:%S",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A %B %d %Y",
    "%A, %B %d, %Y",
];

/// Canonical calendar day in the reporting zone
///
/// Displays and serializes as `YYYY-MM-DD`; ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(DayKey)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Parse an already canonical `YYYY-MM-DD` key
    pub fn parse(key: &str) -> Option<Self> {
        NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok().map(DayKey)
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        DayKey(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DayKey::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid day key: {}", s)))
    }
}

/// The fixed reporting zone
pub fn reporting_zone() -> FixedOffset {
    // constant is well inside the +-24h range
    FixedOffset::east_opt(REPORTING_OFFSET_SECS).unwrap()
}

/// Trim the raw cell value and turn bullet separators into spaces.
pub fn clean_raw(raw: &str) -> String {
    raw.trim().replace(BULLET, " ")
}

/// Resolve a raw date cell to a canonical day key
///
/// Leading `p1[-/]p2[-/]yyyy` dates are read with a fixed policy: a part above
/// 12 must be the day; when both parts could be a month the first one is the
/// month. Anything else goes through generic date parsing and is converted to
/// the reporting zone.
///
/// # Arguments
/// * `raw` - Cell value, possibly a `date • time` composite
///
/// # Returns
/// * `Option<DayKey>` - The day, or `None` if the value cannot be read as a valid date
///
/// # Examples
/// ```
/// use tracker::datekey::resolve_date_key;
///
/// assert_eq!(resolve_date_key("23-01-2026").unwrap().to_string(), "2026-01-23");
/// assert_eq!(resolve_date_key("01-10-2026").unwrap().to_string(), "2026-01-10");
/// assert!(resolve_date_key("garbage").is_none());
/// ```
pub fn resolve_date_key(raw: &str) -> Option<DayKey> {
    let cleaned = clean_raw(raw);
    if cleaned.is_empty() {
        return None;
    }

    if let Some(caps) = NUMERIC_DATE_REGEX.captures(&cleaned) {
        let p1: u32 = caps[1].parse().ok()?;
        let p2: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;

        let (month, day) = if p1 > 12 {
            (p2, p1)
        } else if p2 > 12 {
            (p1, p2)
        } else {
            // ambiguous, month first
            (p1, p2)
        };

        // 31/31/2026 and friends are not days
        return DayKey::from_ymd(year, month, day);
    }

    parse_instant(&cleaned).map(|instant| DayKey(instant.date_naive()))
}

/// Generic date/time parsing used when no fixed pattern applies
///
/// Values with an explicit offset are converted to the reporting zone; values
/// without one are taken as reporting-zone wall clock time. A bare ISO date
/// (`YYYY-MM-DD`) is midnight UTC, any other bare date is local midnight.
pub fn parse_instant(cleaned: &str) -> Option<DateTime<FixedOffset>> {
    let zone = reporting_zone();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let s = ZONE_COMMENT_REGEX.replace(&collapsed, "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&zone));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&zone));
    }
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&zone));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return zone.from_local_datetime(&naive).single();
        }
    }
    // ISO dates on their own are UTC midnight, as browsers read them
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&naive).with_timezone(&zone));
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return zone.from_local_datetime(&naive).single();
        }
    }

    None
}
