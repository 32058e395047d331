use tracker::history::collect_history;
use tracker::matcher::IdentityMatcher;
use tracker::roster::{Identity, Roster};
use tracker::sources::{ActivityEntry, SourceRows};

fn roster() -> Roster {
    Roster::new(vec![
        Identity::new("Shivam Kumar Jha", Some("shivam@example.org"), "INT-001"),
        Identity::new("Rahul Sharma", None, "INT-002"),
    ])
}

fn entry(name: &str, email: Option<&str>, date: &str, summary: &str, tag: &str) -> ActivityEntry {
    ActivityEntry {
        raw_author_name: name.to_string(),
        raw_author_email: email.map(str::to_string),
        raw_date: date.to_string(),
        category: "Learning".to_string(),
        summary: summary.to_string(),
        source_tag: tag.to_string(),
        ..ActivityEntry::default()
    }
}

fn sources() -> Vec<SourceRows> {
    let mut legacy = SourceRows::new(
        "Student Activity",
        vec![entry("Shivam Kumar Jha", None, "2026-02-01", "sign-in", "Student Activity")],
    );
    legacy.include_in_history = false;

    let monitor = SourceRows::new(
        "M1",
        vec![
            entry("S", Some("Shivam@Example.org"), "1/5/2026 21:30:00", "rust basics", "M1"),
            entry("Rahul Sharma", None, "1/6/2026 10:00:00", "not mine", "M1"),
            entry("shivam kumar", None, "garbage", "lost", "M1"),
            entry("Shivam", None, "23-01-2026", "ownership", "M1"),
        ],
    );

    let portal = SourceRows::new(
        "Activity Logs",
        vec![
            entry("Shivam Kumar Jha", None, "Jan 23, 2026 • 9:05 AM", "traits", "Activity Logs"),
            entry("Shivam Kumar Jha", None, "Jan 7, 2026 • 18:45", "lifetimes", "Activity Logs"),
        ],
    );

    vec![legacy, monitor, portal]
}

#[test]
fn test_history_sorted_newest_first() {
    let roster = roster();
    let target = &roster.identities()[0];
    let history = collect_history(&sources(), &roster, &IdentityMatcher::default(), target);

    let summaries: Vec<&str> = history.iter().map(|r| r.summary.as_str()).collect();
    assert_eq!(summaries, vec!["ownership", "traits", "lifetimes", "rust basics"]);
    println!("✓ Newest day first, same-day rows in source order");

    for pair in history.windows(2) {
        assert!(pair[0].day_key >= pair[1].day_key);
    }

    let first = &history[0];
    assert_eq!(first.day_key.to_string(), "2026-01-23");
    assert_eq!(first.source_tag, "M1");
    assert_eq!(first.time_label, "");
    assert_eq!(history[1].time_label, "09:05 AM");
    assert_eq!(history[2].time_label, "06:45 PM");
    assert_eq!(history[3].time_label, "09:30 PM");
    println!("✓ Time labels derived from the raw date cell");
}

#[test]
fn test_history_exclusions() {
    let roster = roster();
    let target = &roster.identities()[0];
    let history = collect_history(&sources(), &roster, &IdentityMatcher::default(), target);

    assert!(history.iter().all(|r| r.source_tag != "Student Activity"));
    println!("✓ Sources flagged out of history are skipped");

    assert!(history.iter().all(|r| r.summary != "lost"));
    println!("✓ Unreadable dates are dropped");

    assert!(history.iter().all(|r| r.summary != "not mine"));
    println!("✓ Other people's rows are not included");

    let rahul = &roster.identities()[1];
    let theirs = collect_history(&sources(), &roster, &IdentityMatcher::default(), rahul);
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].summary, "not mine");
}

#[test]
fn test_history_empty_for_unknown_activity() {
    let roster = Roster::new(vec![Identity::new("Nobody Logged", None, "INT-404")]);
    let target = &roster.identities()[0];
    let history = collect_history(&sources(), &roster, &IdentityMatcher::default(), target);
    assert!(history.is_empty());
    println!("✓ No rows, empty history");
}

#[test]
fn test_authorize() {
    let roster = roster();
    let matcher = IdentityMatcher::default();

    let who = roster.authorize(&matcher, "shivam kumar", " INT-001 ", None);
    assert_eq!(who.map(|i| i.canonical_name.as_str()), Some("Shivam Kumar Jha"));
    println!("✓ Fuzzy name with its own credential");

    assert!(roster.authorize(&matcher, "Shivam Kumar Jha", "INT-002", None).is_none());
    assert!(roster.authorize(&matcher, "Shivam Kumar Jha", "", None).is_none());
    assert!(roster.authorize(&matcher, "Unknown Person", "INT-001", None).is_none());
    println!("✓ Wrong, empty or unowned credentials refused");

    let admin = roster.authorize(&matcher, "Rahul Sharma", "root-key", Some("root-key"));
    assert_eq!(admin.map(|i| i.canonical_name.as_str()), Some("Rahul Sharma"));
    assert!(roster.authorize(&matcher, "Rahul Sharma", "", Some("")).is_none());
    println!("✓ Admin credential accepted only when configured");
}
