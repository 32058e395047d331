use crate::aggregator::AggregateMap;
use crate::roster::Roster;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portal listing row for one roster identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub status: String,
    pub days_completed: usize,
    /// Most recent day key, empty when the person never logged
    pub last_log_date: String,
    pub is_monitor: bool,
    /// Profile photo URL, empty when none was uploaded
    #[serde(default)]
    pub photo: String,
}

/// Aggregation bucket that does not belong to anyone on the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedBucket {
    pub raw_name: String,
    pub days_completed: usize,
    pub last_log_date: String,
}

/// One summary per roster identity, in roster order
///
/// `photos` maps exact canonical names to photo URLs, see
/// [`Workbook::profile_photos`](crate::store::Workbook::profile_photos).
pub fn user_summaries(
    roster: &Roster,
    stats: &AggregateMap,
    photos: &BTreeMap<String, String>,
) -> Vec<UserSummary> {
    roster
        .identities()
        .iter()
        .map(|identity| {
            let s = stats.get(&identity.canonical_name);
            UserSummary {
                name: identity.canonical_name.clone(),
                status: identity.status.clone(),
                days_completed: s.map(|s| s.days_completed()).unwrap_or(0),
                last_log_date: s
                    .map(|s| s.most_recent_day_key().to_string())
                    .unwrap_or_default(),
                is_monitor: identity.is_monitor,
                photo: photos
                    .get(&identity.canonical_name)
                    .cloned()
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// Buckets keyed by names nobody on the roster owns, most active first
pub fn unmatched_buckets(roster: &Roster, stats: &AggregateMap) -> Vec<UnmatchedBucket> {
    let mut buckets: Vec<UnmatchedBucket> = stats
        .iter()
        .filter(|(name, _)| !roster.contains_name(name))
        .map(|(name, s)| UnmatchedBucket {
            raw_name: name.clone(),
            days_completed: s.days_completed(),
            last_log_date: s.most_recent_day_key().to_string(),
        })
        .collect();

    buckets.sort_by(|a, b| {
        b.days_completed
            .cmp(&a.days_completed)
            .then_with(|| a.raw_name.cmp(&b.raw_name))
    });
    buckets
}

/// Convert user summaries to CSV
///
/// Writes a header row followed by one line per summary. Fields containing
/// commas, quotes or newlines are quoted with inner quotes doubled.
///
/// # Examples
/// ```
/// use tracker::report::{UserSummary, to_csv};
///
/// let rows = vec![UserSummary {
///     name: "Jha, Shivam".to_string(),
///     status: "Active".to_string(),
///     days_completed: 3,
///     last_log_date: "2026-01-23".to_string(),
///     is_monitor: false,
///     photo: String::new(),
/// }];
/// let csv = to_csv(&rows);
/// assert!(csv.contains("\"Jha, Shivam\",Active,3,2026-01-23,false"));
/// ```
pub fn to_csv(summaries: &[UserSummary]) -> String {
    let mut csv_content = String::from("Name,Status,Days Completed,Last Log Date,Monitor\n");

    for s in summaries {
        let fields = [
            escape_csv(&s.name),
            escape_csv(&s.status),
            s.days_completed.to_string(),
            s.last_log_date.clone(),
            s.is_monitor.to_string(),
        ];
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    csv_content
}

pub(crate) fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
