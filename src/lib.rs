/*!
# Activity Tracker

Backend of an intern activity portal whose data lives in spreadsheet tabs.

## Overview

Activity rows arrive from several tabs with different column layouts: the old
sign-in sheet, ten monitor tabs imported from another workbook, and the
portal's own log. People type their names differently from tab to tab, dates
come in whatever format the sheet displayed, and only some tabs carry an
email. This crate maps every row to one roster identity and one calendar day
so that the per-person numbers (days completed, last log date, history) come
out right.

## Reconciliation

- **tokenizer**: name normalization into comparable tokens
- **matcher**: fuzzy name equivalence with fixed thresholds
- **datekey**: raw date cell to `YYYY-MM-DD` day key (month-first on ambiguity)
- **timelabel**: raw timestamp to an `hh:mm AM/PM` label
- **aggregator**: multi-source fold into per-identity statistics
- **history**: per-person record list, newest first

## Around it

- **sources**: column layouts and typed entries per source
- **roster**: identities, email lookup and credential checks
- **store**: the tabular store (CSV directory or gzip+bincode snapshot) with a bounded-wait write lock
- **report**: portal listing, unmatched names, CSV export
- **config**: JSON configuration with the deployment defaults
- **app** / **mailer** (feature `web`): HTTP API and credential reminder mails

## REST API Endpoints

- `GET /api/users` - Roster with days completed and last log date
- `GET /api/unmatched` - Log names that match nobody on the roster
- `POST /api/history` - A person's records, needs name and intern ID
- `POST /api/log` - Append an activity, needs name and intern ID
- `GET|POST /api/profile`, `GET|POST /api/progress` - Profile and course progress
- `GET /api/groups` - Monitors and their group members
- `POST /api/send-id` - Mail the intern ID to a roster email
*/

pub mod aggregator;
pub mod config;
pub mod datekey;
pub mod error;
pub mod history;
pub mod matcher;
pub mod report;
pub mod roster;
pub mod sources;
pub mod store;
pub mod timelabel;
pub mod tokenizer;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod mailer;

/// Re-export the main entry points
pub use aggregator::{AggregateMap, AggregateStats, aggregate};
pub use datekey::{DayKey, resolve_date_key};
pub use error::{Result, TrackerError};
pub use history::{HistoryRecord, collect_history};
pub use matcher::{IdentityMatcher, MatchThresholds, are_equivalent};
pub use roster::{Identity, Roster};
pub use sources::{ActivityEntry, ColumnLayout, SourceRows, SourceSpec};
pub use timelabel::extract_time_label;
pub use tokenizer::tokenize;
