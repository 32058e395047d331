//! Tracker configuration
//!
//! Sheet names, column layouts and service settings. Loaded from a JSON file;
//! anything missing falls back to the deployment defaults below.

use crate::error::{Result, TrackerError};
use crate::matcher::MatchThresholds;
use crate::sources::{SourceKind, SourceSpec};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Number of monitor tabs (`M1`..`M10`) in the default layout
pub const MONITOR_TABS: usize = 10;

/// Columns of the roster sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterColumns {
    pub sheet: String,
    pub name: usize,
    pub credential: usize,
    pub status: Option<usize>,
    /// Header text (case-insensitive, exact) of the email column
    pub email_header: String,
    /// Header fragment (case-insensitive) of the monitor checkbox column
    pub monitor_header: String,
}

impl Default for RosterColumns {
    fn default() -> Self {
        RosterColumns {
            sheet: "Student Activity".to_string(),
            name: 0,
            credential: 1,
            status: Some(2),
            email_header: "email".to_string(),
            monitor_header: "monitor".to_string(),
        }
    }
}

/// SMTP account used for credential reminders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub relay: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Mailbox shown as sender, e.g. `Tracker <noreply@example.org>`
    pub from: String,
}

fn default_smtp_port() -> u16 {
    465
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Directory with one CSV file per sheet
    pub data_dir: PathBuf,

    /// Compressed snapshot of the workbook, preferred over `data_dir` when present
    pub snapshot: PathBuf,

    /// Address the web server binds to
    pub listen_addr: String,

    /// Longest wait for the store write lock before reporting busy
    pub lock_wait_ms: u64,

    pub roster: RosterColumns,

    /// Sheet the portal appends new entries to
    pub log_sheet: String,

    pub profile_sheet: String,

    pub course_sheet: String,

    /// Monitor names in the first data row, members below
    pub groups_sheet: String,

    /// Sources in aggregation order
    pub sources: Vec<SourceSpec>,

    /// Credential accepted for every identity, if set
    pub admin_credential: Option<String>,

    pub thresholds: MatchThresholds,

    pub smtp: Option<SmtpSettings>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let mut sources =
            vec![SourceSpec::new("Student Activity", "Student Activity", SourceKind::Legacy).without_history()];
        for i in 1..=MONITOR_TABS {
            let tab = format!("M{}", i);
            sources.push(SourceSpec::new(&tab, &tab, SourceKind::Monitor));
        }
        sources.push(SourceSpec::new("Activity Logs", "Activity Logs", SourceKind::ActivityLog));

        TrackerConfig {
            data_dir: PathBuf::from("database"),
            snapshot: PathBuf::from("database/workbook.bin.gz"),
            listen_addr: "127.0.0.1:3000".to_string(),
            lock_wait_ms: 10_000,
            roster: RosterColumns::default(),
            log_sheet: "Activity Logs".to_string(),
            profile_sheet: "Student Profiles".to_string(),
            course_sheet: "Student Courses".to_string(),
            groups_sheet: "Groups".to_string(),
            sources,
            admin_credential: None,
            thresholds: MatchThresholds::default(),
            smtp: None,
        }
    }
}

impl TrackerConfig {
    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: TrackerConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// `load` when a path is given, validated defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let config = TrackerConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Check everything that would otherwise fail quietly at read time
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(TrackerError::Config("no sources configured".to_string()));
        }

        let mut tags = HashSet::new();
        for source in &self.sources {
            if source.sheet.trim().is_empty() {
                return Err(TrackerError::Config(format!(
                    "source '{}' has no sheet name",
                    source.tag
                )));
            }
            if !tags.insert(source.tag.as_str()) {
                return Err(TrackerError::Config(format!(
                    "duplicate source tag '{}'",
                    source.tag
                )));
            }
            source.resolved_layout()?;
        }

        if self.roster.name == self.roster.credential {
            return Err(TrackerError::Config(
                "roster name and credential share a column".to_string(),
            ));
        }

        let t = &self.thresholds;
        if t.min_token_chars == 0 || !(0.0..=1.0).contains(&t.long_name_ratio) {
            return Err(TrackerError::Config(format!(
                "invalid match thresholds: {:?}",
                t
            )));
        }

        Ok(())
    }

    /// The source that receives portal submissions
    pub fn log_source(&self) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.sheet == self.log_sheet)
    }
}
