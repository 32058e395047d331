use tracker::aggregator::aggregate;
use tracker::matcher::IdentityMatcher;
use tracker::report::{to_csv, unmatched_buckets, user_summaries};
use tracker::roster::{Identity, Roster};
use tracker::sources::{ActivityEntry, SourceRows};
use tracker::store::{ProfileUpdate, Workbook};
use std::collections::BTreeMap;

fn entry(name: &str, date: &str) -> ActivityEntry {
    ActivityEntry {
        raw_author_name: name.to_string(),
        raw_date: date.to_string(),
        ..ActivityEntry::default()
    }
}

fn setup() -> (Roster, Vec<SourceRows>) {
    let mut shivam = Identity::new("Shivam Kumar Jha", None, "INT-001");
    shivam.status = "Active".to_string();
    shivam.is_monitor = true;
    let roster = Roster::new(vec![
        shivam,
        Identity::new("Rahul Sharma", None, "INT-002"),
    ]);

    let sources = vec![SourceRows::new(
        "M1",
        vec![
            entry("Shivam", "1/5/2026"),
            entry("Shivam Kumar", "1/6/2026"),
            entry("Kanishk", "1/6/2026"),
            entry("Zed Unknown", "1/7/2026"),
            entry("Zed Unknown", "1/8/2026"),
            entry("Anu Unknown", "1/9/2026"),
            entry("Anu Unknown", "1/10/2026"),
        ],
    )];
    (roster, sources)
}

#[test]
fn test_user_summaries() {
    let (roster, sources) = setup();
    let stats = aggregate(&sources, &roster, &IdentityMatcher::default());
    let summaries = user_summaries(&roster, &stats, &BTreeMap::new());

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].name, "Shivam Kumar Jha");
    assert_eq!(summaries[0].days_completed, 2);
    assert_eq!(summaries[0].last_log_date, "2026-01-06");
    assert!(summaries[0].is_monitor);
    println!("✓ Roster order with counts and last day");

    assert_eq!(summaries[1].days_completed, 0);
    assert_eq!(summaries[1].last_log_date, "");
    println!("✓ People who never logged show zero");
}

#[test]
fn test_unmatched_buckets() {
    let (roster, sources) = setup();
    let stats = aggregate(&sources, &roster, &IdentityMatcher::default());
    let buckets = unmatched_buckets(&roster, &stats);

    let names: Vec<&str> = buckets.iter().map(|b| b.raw_name.as_str()).collect();
    assert_eq!(names, vec!["Anu Unknown", "Zed Unknown", "Kanishk"]);
    assert_eq!(buckets[0].days_completed, 2);
    assert_eq!(buckets[0].last_log_date, "2026-01-10");
    println!("✓ Most active unmatched names first, ties by name");
}

#[test]
fn test_csv_export() {
    let (roster, sources) = setup();
    let stats = aggregate(&sources, &roster, &IdentityMatcher::default());
    let csv = to_csv(&user_summaries(&roster, &stats, &BTreeMap::new()));

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Name,Status,Days Completed,Last Log Date,Monitor");
    assert_eq!(lines[1], "Shivam Kumar Jha,Active,2,2026-01-06,true");
    assert_eq!(lines[2], "Rahul Sharma,,0,,false");
    assert_eq!(lines.len(), 3);
    println!("✓ CSV header and rows");
}

#[test]
fn test_summaries_carry_profile_photos() {
    let (roster, sources) = setup();
    let stats = aggregate(&sources, &roster, &IdentityMatcher::default());

    let mut workbook = Workbook::new();
    workbook.upsert_profile(
        "Student Profiles",
        &ProfileUpdate {
            name: "Shivam Kumar Jha".to_string(),
            photo: Some("https://img.example.org/shivam.png".to_string()),
            ..ProfileUpdate::default()
        },
    );
    workbook.upsert_profile(
        "Student Profiles",
        &ProfileUpdate {
            name: "Rahul Sharma".to_string(),
            bio: Some("no photo yet".to_string()),
            ..ProfileUpdate::default()
        },
    );

    let photos = workbook.profile_photos("Student Profiles");
    assert_eq!(photos.len(), 1);

    let summaries = user_summaries(&roster, &stats, &photos);
    assert_eq!(summaries[0].photo, "https://img.example.org/shivam.png");
    assert_eq!(summaries[1].photo, "");
    println!("✓ Photos joined by exact roster name");

    assert!(Workbook::new().profile_photos("Student Profiles").is_empty());
}
