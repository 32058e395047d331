use tracker::aggregator::{AggregateMap, aggregate, merge_aggregates};
use tracker::datekey::DayKey;
use tracker::matcher::IdentityMatcher;
use tracker::roster::{Identity, Roster};
use tracker::sources::{ActivityEntry, SourceRows};

fn roster() -> Roster {
    Roster::new(vec![
        Identity::new("Shivam Kumar Jha", Some("shivam@example.org"), "INT-001"),
        Identity::new("Shiva Rama Krishna Boga", None, "INT-002"),
        Identity::new("Kanishka Rao", Some("Kanishka@Example.org"), "INT-003"),
    ])
}

fn entry(name: &str, email: Option<&str>, date: &str) -> ActivityEntry {
    ActivityEntry {
        raw_author_name: name.to_string(),
        raw_author_email: email.map(str::to_string),
        raw_date: date.to_string(),
        ..ActivityEntry::default()
    }
}

fn day(key: &str) -> DayKey {
    DayKey::parse(key).unwrap()
}

fn days_of(stats: &AggregateMap, name: &str) -> Vec<String> {
    stats
        .get(name)
        .map(|s| s.active_day_keys().iter().map(|d| d.to_string()).collect())
        .unwrap_or_default()
}

fn monitor_source() -> SourceRows {
    SourceRows::new(
        "M1",
        vec![
            entry("SKJ", Some("SHIVAM@example.org "), "1/5/2026 21:30:00"),
            entry("shivam kumar", None, "1/6/2026 10:00:00"),
            entry("Shiva", None, "23-01-2026"),
            entry("Kanishk", None, "24-01-2026"),
            entry("Shivam Kumar Jha", None, "not a date"),
        ],
    )
}

fn portal_source() -> SourceRows {
    SourceRows::new(
        "Activity Logs",
        vec![
            entry("Shivam Kumar Jha", None, "Jan 7, 2026 • 9:05 AM"),
            entry("Shivam Kumar Jha", None, "Jan 5, 2026 • 21:30"),
            entry("Kanishk", None, "25-01-2026"),
            entry("", None, "25-01-2026"),
        ],
    )
}

#[test]
fn test_resolution_paths() {
    let stats = aggregate(&[monitor_source()], &roster(), &IdentityMatcher::default());

    // "SKJ" matches no roster name, the email carries it
    assert_eq!(
        days_of(&stats, "Shivam Kumar Jha"),
        vec!["2026-01-05", "2026-01-06"]
    );
    println!("✓ Email and fuzzy name land on the same identity");

    assert_eq!(days_of(&stats, "Shiva Rama Krishna Boga"), vec!["2026-01-23"]);
    println!("✓ Subset match on a first name");

    assert_eq!(days_of(&stats, "Kanishk"), vec!["2026-01-24"]);
    assert!(!stats.contains_key("Kanishka Rao"));
    println!("✓ Unmatched names keep their own bucket");

    assert_eq!(stats.len(), 3);
}

#[test]
fn test_unresolvable_dates_never_count() {
    let source = SourceRows::new(
        "M2",
        vec![
            entry("Shivam Kumar Jha", None, ""),
            entry("Shivam Kumar Jha", None, "garbage"),
            entry("Shivam Kumar Jha", None, "31/31/2026"),
            entry("Nobody Known", None, "garbage"),
        ],
    );
    let stats = aggregate(&[source], &roster(), &IdentityMatcher::default());
    assert!(stats.is_empty());
    println!("✓ Rows without a day are dropped before attribution");
}

#[test]
fn test_email_precedence() {
    let source = SourceRows::new(
        "M3",
        vec![
            entry("Completely Different", Some("kanishka@example.org"), "2026-02-01"),
            entry("", Some("Kanishka@EXAMPLE.org"), "2026-02-02"),
            // not email-like, falls back to the name
            entry("Shivam Kumar", Some("kanishka at example.org"), "2026-02-03"),
        ],
    );
    let stats = aggregate(&[source], &roster(), &IdentityMatcher::default());

    assert_eq!(days_of(&stats, "Kanishka Rao"), vec!["2026-02-01", "2026-02-02"]);
    assert_eq!(days_of(&stats, "Shivam Kumar Jha"), vec!["2026-02-03"]);
    assert!(!stats.contains_key("Completely Different"));
    println!("✓ Email attribution ignores the typed name");
}

#[test]
fn test_most_recent_day() {
    let stats = aggregate(
        &[monitor_source(), portal_source()],
        &roster(),
        &IdentityMatcher::default(),
    );
    let shivam = &stats["Shivam Kumar Jha"];

    assert_eq!(shivam.days_completed(), 3);
    assert_eq!(shivam.most_recent_day_key(), day("2026-01-07"));
    assert!(shivam.active_day_keys().contains(&shivam.most_recent_day_key()));
    println!("✓ Duplicate days counted once, latest day tracked");

    let kanishk = &stats["Kanishk"];
    assert_eq!(kanishk.days_completed(), 2);
    assert_eq!(kanishk.most_recent_day_key(), day("2026-01-25"));
}

#[test]
fn test_idempotent() {
    let sources = [monitor_source(), portal_source()];
    let matcher = IdentityMatcher::default();
    let first = aggregate(&sources, &roster(), &matcher);
    let second = aggregate(&sources, &roster(), &matcher);
    assert_eq!(first, second);
    println!("✓ Same input, same aggregate");
}

#[test]
fn test_union_of_sources() {
    let matcher = IdentityMatcher::default();
    let a = aggregate(&[monitor_source()], &roster(), &matcher);
    let b = aggregate(&[portal_source()], &roster(), &matcher);
    let both = aggregate(&[monitor_source(), portal_source()], &roster(), &matcher);

    assert_eq!(merge_aggregates(a.clone(), &b), both);
    assert_eq!(merge_aggregates(b, &a), both);
    println!("✓ Aggregating sources together equals merging separate aggregates");
}

#[test]
fn test_exact_roster_name_preferred() {
    let roster = Roster::new(vec![
        Identity::new("Shivam Kumar Jha", None, "INT-001"),
        Identity::new("Shivam Kumar", None, "INT-009"),
    ]);
    let source = SourceRows::new("M4", vec![entry("shivam kumar", None, "2026-03-01")]);
    let stats = aggregate(&[source], &roster, &IdentityMatcher::default());

    assert_eq!(days_of(&stats, "Shivam Kumar"), vec!["2026-03-01"]);
    assert!(!stats.contains_key("Shivam Kumar Jha"));
    println!("✓ Exact roster name beats an earlier fuzzy candidate");
}
