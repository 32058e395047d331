use tracker::datekey::{DayKey, resolve_date_key};
use tracker::timelabel::extract_time_label;

// Helper function to check a resolved key
fn assert_key(raw: &str, expected: Option<&str>) {
    let got = resolve_date_key(raw).map(|k| k.to_string());
    assert_eq!(got.as_deref(), expected, "raw value {:?}", raw);
    println!("✓ {:?} => {:?}", raw, expected);
}

#[test]
fn test_numeric_dates() {
    assert_key("23-01-2026", Some("2026-01-23"));
    assert_key("13/02/2026", Some("2026-02-13"));
    assert_key("1/24/2026", Some("2026-01-24"));
    assert_key("1/5/2026 21:30:00", Some("2026-01-05"));
}

#[test]
fn test_ambiguous_dates_are_month_first() {
    assert_key("01-10-2026", Some("2026-01-10"));
    assert_key("05/01/2026 • 10:30 AM", Some("2026-05-01"));
    assert_key("12/11/2025", Some("2025-12-11"));
}

#[test]
fn test_impossible_numeric_dates() {
    assert_key("31/31/2026", None);
    assert_key("02/30/2026", None);
    assert_key("0/12/2026", None);
}

#[test]
fn test_unresolvable() {
    assert_key("", None);
    assert_key("   ", None);
    assert_key("garbage", None);
    assert_key("•", None);
}

#[test]
fn test_generic_fallback() {
    assert_key("2026-01-05", Some("2026-01-05"));
    assert_key("Jan 5, 2026 • 21:30", Some("2026-01-05"));
    assert_key("January 5, 2026", Some("2026-01-05"));
    assert_key("2026-01-05T10:00:00+05:30", Some("2026-01-05"));
    assert_key(
        "Mon Jan 05 2026 21:30:00 GMT+0530 (India Standard Time)",
        Some("2026-01-05"),
    );
}

#[test]
fn test_fallback_converts_to_reporting_zone() {
    // 20:00 UTC is already the next morning at +05:30
    assert_key("2026-01-05T20:00:00Z", Some("2026-01-06"));
    assert_key("Mon, 05 Jan 2026 20:00:00 +0000", Some("2026-01-06"));
    assert_key("2026-01-05T18:00:00Z", Some("2026-01-05"));
}

#[test]
fn test_day_key_ordering_and_serde() {
    let earlier = DayKey::parse("2025-12-31").unwrap();
    let later = resolve_date_key("01-10-2026").unwrap();
    assert!(later > earlier);
    assert!(DayKey::from_ymd(2026, 2, 9).unwrap() < DayKey::from_ymd(2026, 10, 1).unwrap());
    println!("✓ Day keys compare chronologically");

    let json = serde_json::to_string(&later).unwrap();
    assert_eq!(json, "\"2026-01-10\"");
    let back: DayKey = serde_json::from_str(&json).unwrap();
    assert_eq!(back, later);
    assert!(serde_json::from_str::<DayKey>("\"2026-13-01\"").is_err());
    println!("✓ Day keys serialize as YYYY-MM-DD");
}

#[test]
fn test_time_labels() {
    assert_eq!(extract_time_label("Jan 5, 2026 • 21:30"), "09:30 PM");
    assert_eq!(extract_time_label("Jan 5, 2026 • 9:05 AM"), "09:05 AM");
    assert_eq!(extract_time_label("1/5/2026 9:05 pm"), "09:05 PM");
    println!("✓ Explicit and 24h times");

    assert_eq!(extract_time_label("1/5/2026 0:15:00"), "12:15 AM");
    assert_eq!(extract_time_label("1/5/2026 12:00:00"), "12:00 PM");
    assert_eq!(extract_time_label("1/5/2026 23:59:59"), "11:59 PM");
    println!("✓ Midnight and noon");

    // captured hour is kept as written when a marker is present
    assert_eq!(extract_time_label("14:10 PM"), "14:10 PM");

    assert_eq!(extract_time_label(""), "");
    assert_eq!(extract_time_label("no time here"), "");
    assert_eq!(extract_time_label("January 5, 2026"), "12:00 AM");
    println!("✓ Fallbacks");
}

#[test]
fn test_bare_iso_date_is_utc_midnight() {
    assert_eq!(extract_time_label("2026-01-05"), "05:30 AM");
    assert_key("2026-01-05", Some("2026-01-05"));
    assert_key("2025-12-31", Some("2025-12-31"));
    println!("✓ ISO date read as UTC midnight, day unchanged");
}
