use crate::aggregator::resolve_author;
use crate::datekey::{DayKey, resolve_date_key};
use crate::matcher::IdentityMatcher;
use crate::roster::{Identity, Roster};
use crate::sources::SourceRows;
use crate::timelabel::extract_time_label;
use serde::{Deserialize, Serialize};

/// One log line as shown on a person's history page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub day_key: DayKey,
    pub time_label: String,
    pub category: String,
    pub summary: String,
    pub proof_ref: String,
    pub file_ref: String,
    pub duration_label: String,
    pub issues: String,
    pub source_tag: String,
}

/// Collect the history of one identity
///
/// Each row's author is resolved exactly as during aggregation (email first,
/// then roster names) and kept when it resolves to `target`. Rows without a
/// readable date are dropped and sources flagged as not part of history are
/// skipped. The caller is responsible for checking the credential first.
///
/// # Returns
/// * `Vec<HistoryRecord>` - Most recent day first; rows of the same day keep source order
pub fn collect_history(
    sources: &[SourceRows],
    roster: &Roster,
    matcher: &IdentityMatcher,
    target: &Identity,
) -> Vec<HistoryRecord> {
    let mut records = Vec::new();

    for source in sources.iter().filter(|s| s.include_in_history) {
        for entry in &source.entries {
            let Some(day_key) = resolve_date_key(&entry.raw_date) else {
                continue;
            };

            let belongs = resolve_author(entry, roster, matcher, |_| false)
                .map(|author| author.key() == target.canonical_name)
                .unwrap_or(false);
            if !belongs {
                continue;
            }

            records.push(HistoryRecord {
                day_key,
                time_label: extract_time_label(&entry.raw_date),
                category: entry.category.clone(),
                summary: entry.summary.clone(),
                proof_ref: entry.proof_ref.clone(),
                file_ref: entry.file_ref.clone(),
                duration_label: entry.duration_label.clone(),
                issues: entry.issues.clone(),
                source_tag: entry.source_tag.clone(),
            });
        }
    }

    // stable, so same-day rows stay in source order
    records.sort_by(|a, b| b.day_key.cmp(&a.day_key));
    records
}
