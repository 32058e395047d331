use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Category used when a row does not name one
pub const DEFAULT_CATEGORY: &str = "Learning";

/// One raw submission from any source, already mapped to named fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub raw_author_name: String,
    pub raw_author_email: Option<String>,
    pub raw_date: String,
    pub category: String,
    pub summary: String,
    pub proof_ref: String,
    pub file_ref: String,
    pub duration_label: String,
    pub issues: String,
    /// Name of the source the row came from
    pub source_tag: String,
}

/// Positional meaning of the columns of one source sheet (0-based)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date: usize,
    #[serde(default)]
    pub name: Option<usize>,
    #[serde(default)]
    pub email: Option<usize>,
    #[serde(default)]
    pub category: Option<usize>,
    #[serde(default)]
    pub summary: Option<usize>,
    #[serde(default)]
    pub proof: Option<usize>,
    #[serde(default)]
    pub file: Option<usize>,
    #[serde(default)]
    pub duration: Option<usize>,
    #[serde(default)]
    pub issues: Option<usize>,
}

impl ColumnLayout {
    /// Name, timestamp; the old sign-in sheet
    pub fn legacy() -> Self {
        ColumnLayout {
            date: 1,
            name: Some(0),
            email: None,
            category: None,
            summary: None,
            proof: None,
            file: None,
            duration: None,
            issues: None,
        }
    }

    /// Monitor tabs: timestamp, email, name, course, duration, issues, learning
    pub fn monitor() -> Self {
        ColumnLayout {
            date: 0,
            name: Some(2),
            email: Some(1),
            category: Some(3),
            summary: Some(6),
            proof: None,
            file: None,
            duration: Some(4),
            issues: Some(5),
        }
    }

    /// Portal log: name, date, category, summary, proof, file, duration
    pub fn activity_log() -> Self {
        ColumnLayout {
            date: 1,
            name: Some(0),
            email: None,
            category: Some(2),
            summary: Some(3),
            proof: Some(4),
            file: Some(5),
            duration: Some(6),
            issues: None,
        }
    }

    fn columns(&self) -> Vec<(&'static str, usize)> {
        let optional = [
            ("name", self.name),
            ("email", self.email),
            ("category", self.category),
            ("summary", self.summary),
            ("proof", self.proof),
            ("file", self.file),
            ("duration", self.duration),
            ("issues", self.issues),
        ];
        std::iter::once(("date", self.date))
            .chain(optional.into_iter().filter_map(|(n, c)| c.map(|c| (n, c))))
            .collect()
    }

    /// Reject layouts that could never produce a usable entry
    ///
    /// A row needs an author, so a layout without both name and email
    /// columns is an error, as is mapping two fields onto one column.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_none() && self.email.is_none() {
            return Err(TrackerError::Config(
                "column layout needs a name or an email column".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (field, col) in self.columns() {
            if !seen.insert(col) {
                return Err(TrackerError::Config(format!(
                    "column {} is mapped twice (again as '{}')",
                    col, field
                )));
            }
        }
        Ok(())
    }

    /// Widest column index the layout reads
    pub fn width(&self) -> usize {
        self.columns().iter().map(|(_, c)| c + 1).max().unwrap_or(0)
    }

    /// Map one raw row onto an [`ActivityEntry`]
    ///
    /// Short rows are fine: missing cells read as empty strings.
    pub fn to_entry(&self, cells: &[String], source_tag: &str) -> ActivityEntry {
        let cell = |col: Option<usize>| -> String {
            col.and_then(|c| cells.get(c))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let email = cell(self.email);
        let category = cell(self.category);

        ActivityEntry {
            raw_author_name: cell(self.name),
            raw_author_email: if email.is_empty() { None } else { Some(email) },
            raw_date: cell(Some(self.date)),
            category: if category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category
            },
            summary: cell(self.summary),
            proof_ref: cell(self.proof),
            file_ref: cell(self.file),
            duration_label: cell(self.duration),
            issues: cell(self.issues),
            source_tag: source_tag.to_string(),
        }
    }
}

/// Built-in source shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Legacy,
    Monitor,
    ActivityLog,
}

impl SourceKind {
    pub fn layout(&self) -> ColumnLayout {
        match self {
            SourceKind::Legacy => ColumnLayout::legacy(),
            SourceKind::Monitor => ColumnLayout::monitor(),
            SourceKind::ActivityLog => ColumnLayout::activity_log(),
        }
    }
}

/// Where a source lives and how to read it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Tag attached to every entry from this source
    pub tag: String,

    /// Sheet holding the rows
    pub sheet: String,

    /// Built-in shape, ignored when `layout` is given
    #[serde(default)]
    pub kind: Option<SourceKind>,

    /// Explicit column mapping
    #[serde(default)]
    pub layout: Option<ColumnLayout>,

    /// Whether rows from this source show up in personal history
    #[serde(default = "default_true")]
    pub include_in_history: bool,
}

fn default_true() -> bool {
    true
}

impl SourceSpec {
    pub fn new(tag: &str, sheet: &str, kind: SourceKind) -> Self {
        SourceSpec {
            tag: tag.to_string(),
            sheet: sheet.to_string(),
            kind: Some(kind),
            layout: None,
            include_in_history: true,
        }
    }

    pub fn without_history(mut self) -> Self {
        self.include_in_history = false;
        self
    }

    /// Effective layout; fails when neither a kind nor a layout is set
    pub fn resolved_layout(&self) -> Result<ColumnLayout> {
        let layout = match (&self.layout, self.kind) {
            (Some(layout), _) => layout.clone(),
            (None, Some(kind)) => kind.layout(),
            (None, None) => {
                return Err(TrackerError::Config(format!(
                    "source '{}' has neither a kind nor a layout",
                    self.tag
                )));
            }
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Convert raw sheet rows (header already removed) into typed entries
    pub fn rows_from_cells(&self, rows: &[Vec<String>]) -> Result<SourceRows> {
        let layout = self.resolved_layout()?;
        let entries = rows
            .iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .map(|r| layout.to_entry(r, &self.tag))
            .collect();

        Ok(SourceRows {
            tag: self.tag.clone(),
            include_in_history: self.include_in_history,
            entries,
        })
    }
}

/// All entries of one source, in sheet order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRows {
    pub tag: String,
    pub include_in_history: bool,
    pub entries: Vec<ActivityEntry>,
}

impl SourceRows {
    pub fn new(tag: &str, entries: Vec<ActivityEntry>) -> Self {
        SourceRows {
            tag: tag.to_string(),
            include_in_history: true,
            entries,
        }
    }
}
