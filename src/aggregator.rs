use crate::datekey::{DayKey, resolve_date_key};
use crate::matcher::IdentityMatcher;
use crate::roster::{Roster, is_email_like};
use crate::sources::{ActivityEntry, SourceRows};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-identity statistics derived from the logs
///
/// Only built from a first day, so `most_recent_day_key` is always one of
/// `active_day_keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    active_day_keys: BTreeSet<DayKey>,
    most_recent_day_key: DayKey,
}

impl AggregateStats {
    pub fn starting_at(day: DayKey) -> Self {
        let mut active_day_keys = BTreeSet::new();
        active_day_keys.insert(day);
        AggregateStats {
            active_day_keys,
            most_recent_day_key: day,
        }
    }

    pub fn fold(&mut self, day: DayKey) {
        self.active_day_keys.insert(day);
        if day > self.most_recent_day_key {
            self.most_recent_day_key = day;
        }
    }

    /// Union with another set of stats for the same identity
    pub fn merge(&mut self, other: &AggregateStats) {
        for day in &other.active_day_keys {
            self.fold(*day);
        }
    }

    pub fn active_day_keys(&self) -> &BTreeSet<DayKey> {
        &self.active_day_keys
    }

    pub fn most_recent_day_key(&self) -> DayKey {
        self.most_recent_day_key
    }

    /// Distinct days with at least one entry
    pub fn days_completed(&self) -> usize {
        self.active_day_keys.len()
    }
}

/// Aggregates keyed by canonical name (or raw name for unmatched authors)
pub type AggregateMap = BTreeMap<String, AggregateStats>;

/// How an entry's author was decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    /// Roster email matched
    Email(String),
    /// Name equal to a key already in the aggregate
    KnownKey(String),
    /// Roster name matched by the identity matcher
    Roster(String),
    /// Nobody on the roster; the raw name is kept as its own bucket
    Unrecognized(String),
}

impl Attribution {
    pub fn key(&self) -> &str {
        match self {
            Attribution::Email(k)
            | Attribution::KnownKey(k)
            | Attribution::Roster(k)
            | Attribution::Unrecognized(k) => k,
        }
    }

    pub fn into_key(self) -> String {
        match self {
            Attribution::Email(k)
            | Attribution::KnownKey(k)
            | Attribution::Roster(k)
            | Attribution::Unrecognized(k) => k,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Attribution::Unrecognized(_))
    }
}

/// Resolve the author of one entry
///
/// Email beats names. `is_known_key` lets the aggregation pass short-cut names
/// it has already bucketed. Returns `None` only when the entry carries neither
/// a matching email nor any name at all.
pub fn resolve_author(
    entry: &ActivityEntry,
    roster: &Roster,
    matcher: &IdentityMatcher,
    is_known_key: impl Fn(&str) -> bool,
) -> Option<Attribution> {
    if let Some(email) = entry.raw_author_email.as_deref() {
        if is_email_like(email) {
            if let Some(identity) = roster.find_by_email(email) {
                return Some(Attribution::Email(identity.canonical_name.clone()));
            }
        }
    }

    let raw_name = entry.raw_author_name.as_str();
    if raw_name.trim().is_empty() {
        return None;
    }

    if is_known_key(raw_name) {
        return Some(Attribution::KnownKey(raw_name.to_string()));
    }

    match roster.find_by_name(matcher, raw_name) {
        Some(identity) => Some(Attribution::Roster(identity.canonical_name.clone())),
        None => Some(Attribution::Unrecognized(raw_name.to_string())),
    }
}

/// Fold every source into per-identity statistics
///
/// Sources are processed in the order given. Rows without a readable date or
/// without any author are skipped; nothing here fails on dirty data.
///
/// # Arguments
/// * `sources` - Entries per source, already mapped from their sheets
/// * `roster` - Canonical identities
/// * `matcher` - Name matcher to use
///
/// # Returns
/// * `AggregateMap` - Statistics keyed by canonical name
pub fn aggregate(sources: &[SourceRows], roster: &Roster, matcher: &IdentityMatcher) -> AggregateMap {
    let mut stats = AggregateMap::new();

    for source in sources {
        let mut skipped = 0usize;
        for entry in &source.entries {
            let Some(day) = resolve_date_key(&entry.raw_date) else {
                skipped += 1;
                continue;
            };

            let Some(author) = resolve_author(entry, roster, matcher, |k| stats.contains_key(k)) else {
                skipped += 1;
                continue;
            };

            if !author.is_recognized() {
                debug!("[{}] unmatched author '{}'", source.tag, author.key());
            }

            match stats.get_mut(author.key()) {
                Some(s) => s.fold(day),
                None => {
                    stats.insert(author.into_key(), AggregateStats::starting_at(day));
                }
            }
        }
        if skipped > 0 {
            debug!("[{}] skipped {} unusable rows", source.tag, skipped);
        }
    }

    stats
}

/// Merge two aggregates by identity, unioning the day sets
pub fn merge_aggregates(mut left: AggregateMap, right: &AggregateMap) -> AggregateMap {
    for (name, theirs) in right {
        match left.get_mut(name) {
            Some(ours) => ours.merge(theirs),
            None => {
                left.insert(name.clone(), theirs.clone());
            }
        }
    }
    left
}
