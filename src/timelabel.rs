use crate::datekey::{clean_raw, parse_instant};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TIME_REGEX: Regex =
        Regex::new(r"(\d{1,2}):(\d{2})(?::(\d{2}))?\s*(AM|PM|am|pm)?").unwrap();
}

/// Extract a display time (`hh:mm AM/PM`) from a raw timestamp cell
///
/// The first `h:mm` found in the value is used as written. An explicit AM/PM
/// marker keeps the hour as captured; without one the hour is read as 24h and
/// converted. Values without a visible time fall back to generic parsing in
/// the reporting zone.
///
/// # Returns
/// * `String` - The label, or an empty string when no time can be found
///
/// # Examples
/// ```
/// use tracker::timelabel::extract_time_label;
///
/// assert_eq!(extract_time_label("Jan 5, 2026 • 21:30"), "09:30 PM");
/// assert_eq!(extract_time_label("Jan 5, 2026 • 9:05 am"), "09:05 AM");
/// assert_eq!(extract_time_label("no time here"), "");
/// ```
pub fn extract_time_label(raw: &str) -> String {
    let cleaned = clean_raw(raw);
    if cleaned.is_empty() {
        return String::new();
    }

    if let Some(caps) = TIME_REGEX.captures(&cleaned) {
        let hour: u32 = match caps[1].parse() {
            Ok(h) => h,
            Err(_) => return String::new(),
        };
        let minutes = &caps[2];

        return match caps.get(4) {
            Some(marker) => format!("{:02}:{} {}", hour, minutes, marker.as_str().to_uppercase()),
            None => {
                let suffix = if hour >= 12 { "PM" } else { "AM" };
                let display = match hour % 12 {
                    0 => 12,
                    h => h,
                };
                format!("{:02}:{} {}", display, minutes, suffix)
            }
        };
    }

    match parse_instant(&cleaned) {
        Some(instant) => instant.format("%I:%M %p").to_string(),
        None => String::new(),
    }
}
