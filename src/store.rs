use crate::config::{RosterColumns, TrackerConfig};
use crate::datekey::resolve_date_key;
use crate::error::{Result, TrackerError};
use crate::matcher::IdentityMatcher;
use crate::report::escape_csv;
use crate::roster::{Identity, Roster, is_email_like};
use crate::sources::{DEFAULT_CATEGORY, SourceRows, SourceSpec};
use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

/// Header written when the activity log sheet is created
pub const LOG_HEADER: [&str; 7] = ["Name", "Date", "Category", "Summary", "Proof", "File", "Duration"];
pub const PROFILE_HEADER: [&str; 5] = ["Name", "Bio", "Photo", "LinkedIn", "Instagram"];
pub const COURSE_HEADER: [&str; 2] = ["Name", "Progress"];

const LOCK_POLL: Duration = Duration::from_millis(25);

/// One sheet: a header row and data rows of display strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn with_header(header: &[&str]) -> Self {
        Sheet {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// First column whose header satisfies `pred` (headers trimmed, lower-cased)
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.header
            .iter()
            .position(|h| pred(&h.trim().to_lowercase()))
    }
}

/// New activity submitted through the portal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEntry {
    pub date: String,
    #[serde(default, alias = "course")]
    pub category: String,
    #[serde(default, alias = "learning")]
    pub summary: String,
    #[serde(default)]
    pub proof: String,
    #[serde(default)]
    pub file: String,
    #[serde(default, alias = "time")]
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub bio: String,
    pub photo: String,
    pub linkedin: String,
    pub instagram: String,
}

/// Profile fields sent by the portal; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// An empty photo also keeps the stored one
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub instagram: Option<String>,
}

/// A monitor and the people in their group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorGroup {
    pub monitor: String,
    pub members: Vec<String>,
}

/// The whole tabular store, sheets keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    /// Get a sheet, creating it with `header` when missing
    pub fn sheet_or_create(&mut self, name: &str, header: &[&str]) -> &mut Sheet {
        self.sheets
            .entry(name.to_string())
            .or_insert_with(|| Sheet::with_header(header))
    }

    /// Open the store described by the config
    ///
    /// Prefers the snapshot, then the CSV directory, then an empty workbook.
    pub fn open(config: &TrackerConfig) -> Result<Self> {
        if config.snapshot.exists() {
            return load_snapshot(&config.snapshot);
        }
        if config.data_dir.is_dir() {
            return from_csv_dir(&config.data_dir);
        }
        warn!(
            "no snapshot at {} and no data dir at {}, starting empty",
            config.snapshot.display(),
            config.data_dir.display()
        );
        Ok(Workbook::new())
    }

    /// Entries of one source; a missing sheet has no rows
    pub fn source_rows(&self, spec: &SourceSpec) -> Result<SourceRows> {
        match self.sheet(&spec.sheet) {
            Some(sheet) => spec.rows_from_cells(&sheet.rows),
            None => {
                debug!("source sheet '{}' not found", spec.sheet);
                spec.rows_from_cells(&[])
            }
        }
    }

    /// Entries of every configured source, in config order
    pub fn all_source_rows(&self, config: &TrackerConfig) -> Result<Vec<SourceRows>> {
        config.sources.iter().map(|s| self.source_rows(s)).collect()
    }

    /// Read the roster sheet
    ///
    /// Rows with an empty name are ignored. The email and monitor columns are
    /// located by header text so they may move around.
    pub fn roster(&self, columns: &RosterColumns) -> Roster {
        let Some(sheet) = self.sheet(&columns.sheet) else {
            warn!("roster sheet '{}' not found", columns.sheet);
            return Roster::default();
        };

        let email_header = columns.email_header.to_lowercase();
        let monitor_header = columns.monitor_header.to_lowercase();
        let email_col = sheet.find_column(|h| h == email_header);
        let monitor_col = sheet.find_column(|h| h.contains(monitor_header.as_str()));

        let identities = sheet
            .rows
            .iter()
            .filter(|row| !cell(row, Some(columns.name)).is_empty())
            .map(|row| {
                let email = cell(row, email_col);
                let mut identity = Identity::new(
                    &cell(row, Some(columns.name)),
                    Some(email.as_str()),
                    &cell(row, Some(columns.credential)),
                );
                identity.status = cell(row, columns.status);
                identity.is_monitor = cell(row, monitor_col).eq_ignore_ascii_case("true");
                identity
            })
            .collect();

        Roster::new(identities)
    }

    /// Append a portal submission to the log sheet
    ///
    /// The author is written under the identity's canonical name so later
    /// reads resolve it without fuzzy matching. Dates that would never show up
    /// anywhere are refused.
    pub fn append_entry(&mut self, log_sheet: &str, author: &Identity, entry: &NewEntry) -> Result<()> {
        let date = entry.date.trim();
        if resolve_date_key(date).is_none() {
            return Err(TrackerError::InvalidInput(format!("unreadable date '{}'", date)));
        }

        let category = if entry.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            entry.category.trim()
        };

        let row = vec![
            author.canonical_name.clone(),
            date.to_string(),
            category.to_string(),
            entry.summary.trim().to_string(),
            entry.proof.trim().to_string(),
            entry.file.trim().to_string(),
            entry.duration.trim().to_string(),
        ];

        self.sheet_or_create(log_sheet, &LOG_HEADER).rows.push(row);
        info!("appended log entry for '{}' on {}", author.canonical_name, date);
        Ok(())
    }

    /// Profile of a person, matched by name equivalence
    pub fn profile(&self, profile_sheet: &str, matcher: &IdentityMatcher, name: &str) -> Option<Profile> {
        let sheet = self.sheet(profile_sheet)?;
        let row = sheet
            .rows
            .iter()
            .find(|r| r.first().is_some_and(|n| matcher.are_equivalent(n, name)))?;

        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();
        Some(Profile {
            name: cell(0),
            bio: cell(1),
            photo: cell(2),
            linkedin: cell(3),
            instagram: cell(4),
        })
    }

    /// Photo URL per exact profile name, for the portal listing
    pub fn profile_photos(&self, profile_sheet: &str) -> BTreeMap<String, String> {
        let mut photos = BTreeMap::new();
        if let Some(sheet) = self.sheet(profile_sheet) {
            for row in &sheet.rows {
                let name = cell(row, Some(0));
                let photo = cell(row, Some(2));
                if !name.is_empty() && !photo.is_empty() {
                    photos.insert(name, photo);
                }
            }
        }
        photos
    }

    /// Insert or update the profile row whose name equals `update.name`
    ///
    /// Fields that were not sent keep their stored value; so does an empty
    /// photo. Returns the photo now stored for the person.
    pub fn upsert_profile(&mut self, profile_sheet: &str, update: &ProfileUpdate) -> String {
        let sheet = self.sheet_or_create(profile_sheet, &PROFILE_HEADER);
        let photo = update.photo.as_deref().filter(|p| !p.is_empty());

        match sheet.rows.iter_mut().find(|r| r.first() == Some(&update.name)) {
            Some(row) => {
                if row.len() < PROFILE_HEADER.len() {
                    row.resize(PROFILE_HEADER.len(), String::new());
                }
                let fields = [
                    (1, update.bio.as_deref()),
                    (2, photo),
                    (3, update.linkedin.as_deref()),
                    (4, update.instagram.as_deref()),
                ];
                for (i, value) in fields {
                    if let Some(value) = value {
                        row[i] = value.to_string();
                    }
                }
                row[2].clone()
            }
            None => {
                let photo = photo.unwrap_or_default().to_string();
                sheet.rows.push(vec![
                    update.name.clone(),
                    update.bio.clone().unwrap_or_default(),
                    photo.clone(),
                    update.linkedin.clone().unwrap_or_default(),
                    update.instagram.clone().unwrap_or_default(),
                ]);
                photo
            }
        }
    }

    /// Monitor groups from the groups sheet
    ///
    /// The first data row holds monitor names from the second column on;
    /// the cells below each name are that monitor's members. Blank names
    /// and blank member cells are skipped, a missing sheet has no groups.
    pub fn monitor_groups(&self, groups_sheet: &str) -> Vec<MonitorGroup> {
        let Some(sheet) = self.sheet(groups_sheet) else {
            return Vec::new();
        };
        let Some((monitors, members)) = sheet.rows.split_first() else {
            return Vec::new();
        };

        monitors
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(col, name)| MonitorGroup {
                monitor: name.trim().to_string(),
                members: members
                    .iter()
                    .map(|row| cell(row, Some(col)))
                    .filter(|m| !m.is_empty())
                    .collect(),
            })
            .collect()
    }

    /// Fill empty roster emails from the sources that carry an email column
    ///
    /// Every (name, email) pair seen in those sources is collected, a later
    /// email for the same name replacing an earlier one. A roster row without
    /// an email then takes the email of the identical name, or else of the
    /// first collected name the matcher accepts. The email column is created
    /// when the roster has none. Existing emails are never replaced.
    ///
    /// # Returns
    /// * `Result<usize>` - Number of roster rows that received an email
    pub fn sync_roster_emails(
        &mut self,
        columns: &RosterColumns,
        sources: &[SourceSpec],
        matcher: &IdentityMatcher,
    ) -> Result<usize> {
        let mut known: Vec<(String, String)> = Vec::new();
        for spec in sources {
            if spec.resolved_layout()?.email.is_none() {
                continue;
            }
            for entry in self.source_rows(spec)?.entries {
                let name = entry.raw_author_name.trim();
                let Some(email) = entry.raw_author_email.as_deref().map(str::trim) else {
                    continue;
                };
                if name.is_empty() || !is_email_like(email) {
                    continue;
                }
                match known.iter_mut().find(|(n, _)| n == name) {
                    Some(pair) => pair.1 = email.to_string(),
                    None => known.push((name.to_string(), email.to_string())),
                }
            }
        }

        let Some(sheet) = self.sheets.get_mut(&columns.sheet) else {
            warn!("roster sheet '{}' not found, no emails synced", columns.sheet);
            return Ok(0);
        };

        let email_header = columns.email_header.to_lowercase();
        let email_col = match sheet.find_column(|h| h == email_header) {
            Some(col) => col,
            None => {
                sheet.header.push("Email".to_string());
                sheet.header.len() - 1
            }
        };

        let mut updated = 0;
        for row in sheet.rows.iter_mut() {
            let name = cell(row, Some(columns.name));
            if name.is_empty() || !cell(row, Some(email_col)).is_empty() {
                continue;
            }

            let found = known
                .iter()
                .find(|(n, _)| *n == name)
                .or_else(|| known.iter().find(|(n, _)| matcher.are_equivalent(&name, n)));

            if let Some((_, email)) = found {
                if row.len() <= email_col {
                    row.resize(email_col + 1, String::new());
                }
                row[email_col] = email.clone();
                updated += 1;
            }
        }

        info!("synced {} roster emails", updated);
        Ok(updated)
    }

    /// Stored course progress JSON for an exact name, `{}` when absent or corrupt
    pub fn course_progress(&self, course_sheet: &str, name: &str) -> serde_json::Value {
        let empty = serde_json::json!({});
        let Some(sheet) = self.sheet(course_sheet) else {
            return empty;
        };
        sheet
            .rows
            .iter()
            .find(|r| r.first().map(String::as_str) == Some(name))
            .and_then(|r| r.get(1))
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(empty)
    }

    pub fn save_course_progress(
        &mut self,
        course_sheet: &str,
        name: &str,
        progress: &serde_json::Value,
    ) -> Result<()> {
        let json = serde_json::to_string(progress)?;
        let sheet = self.sheet_or_create(course_sheet, &COURSE_HEADER);

        match sheet.rows.iter_mut().find(|r| r.first().map(String::as_str) == Some(name)) {
            Some(row) => {
                if row.len() < 2 {
                    row.resize(2, String::new());
                }
                row[1] = json;
            }
            None => sheet.rows.push(vec![name.to_string(), json]),
        }
        Ok(())
    }
}

/// Workbook shared between request handlers
///
/// Writers take the lock with a bounded wait and get [`TrackerError::Busy`]
/// instead of queueing forever.
pub struct SharedWorkbook {
    inner: Mutex<Workbook>,
    lock_wait: Duration,
}

impl SharedWorkbook {
    pub fn new(workbook: Workbook, lock_wait: Duration) -> Self {
        SharedWorkbook {
            inner: Mutex::new(workbook),
            lock_wait,
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Workbook>> {
        let deadline = Instant::now() + self.lock_wait;
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Ok(guard),
                // a panicked writer leaves whole rows behind, keep serving
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        warn!("store lock not acquired within {:?}", self.lock_wait);
                        return Err(TrackerError::Busy);
                    }
                    std::thread::sleep(LOCK_POLL);
                }
            }
        }
    }

    /// Run `f` on a consistent copy-free view of the workbook
    pub fn read<T>(&self, f: impl FnOnce(&Workbook) -> T) -> Result<T> {
        let guard = self.acquire()?;
        Ok(f(&guard))
    }

    /// Run a mutation under the write lock
    pub fn write<T>(&self, f: impl FnOnce(&mut Workbook) -> Result<T>) -> Result<T> {
        let mut guard = self.acquire()?;
        f(&mut guard)
    }

    /// Mutate a copy of the workbook and keep it only if `commit` succeeds
    ///
    /// `commit` sees the mutated copy (typically to persist it). On any error
    /// the shared workbook stays exactly as it was.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut Workbook) -> Result<T>,
        commit: impl FnOnce(&Workbook) -> Result<()>,
    ) -> Result<T> {
        let mut guard = self.acquire()?;
        let mut draft = guard.clone();
        let value = mutate(&mut draft)?;
        commit(&draft)?;
        *guard = draft;
        Ok(value)
    }

    pub fn into_inner(self) -> Workbook {
        match self.inner.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub fn save_snapshot(workbook: &Workbook, filename: impl AsRef<Path>) -> Result<()> {
    let filename = filename.as_ref();
    if let Some(parent) = filename.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(filename)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, workbook)?;
    let encoder = writer
        .into_inner()
        .map_err(|e| TrackerError::Io(e.into_error()))?;
    encoder.finish()?;

    info!("saved snapshot to {}", filename.display());
    Ok(())
}

pub fn load_snapshot(filename: impl AsRef<Path>) -> Result<Workbook> {
    let filename = filename.as_ref();
    let file = File::open(filename)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let workbook: Workbook = deserialize_from(&mut reader)?;
    info!(
        "loaded snapshot {} ({} sheets)",
        filename.display(),
        workbook.sheets.len()
    );
    Ok(workbook)
}

/// Load every `*.csv` file of a directory as a sheet named after the file
///
/// The first line of each file is the header.
pub fn from_csv_dir(dir: impl AsRef<Path>) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    for entry in fs::read_dir(dir.as_ref())?.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let mut text = String::new();
        BufReader::new(File::open(&path)?).read_to_string(&mut text)?;

        let mut records = parse_csv_records(&text).into_iter();
        let header = records.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = records
            .filter(|r| !(r.len() == 1 && r[0].trim().is_empty()))
            .collect();

        debug!("sheet '{}': {} rows", name, rows.len());
        workbook.sheets.insert(name.to_string(), Sheet { header, rows });
    }

    info!(
        "loaded {} sheets from {}",
        workbook.sheets.len(),
        dir.as_ref().display()
    );
    Ok(workbook)
}

/// Write each sheet to `<dir>/<sheet>.csv`
pub fn save_csv_dir(workbook: &Workbook, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    for (name, sheet) in &workbook.sheets {
        let mut out = BufWriter::new(File::create(dir.join(format!("{}.csv", name)))?);
        writeln!(out, "{}", csv_line(&sheet.header))?;
        for row in &sheet.rows {
            writeln!(out, "{}", csv_line(row))?;
        }
        out.flush()?;
    }
    Ok(())
}

fn cell(row: &[String], col: Option<usize>) -> String {
    col.and_then(|c| row.get(c))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| escape_csv(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse one CSV line into its fields
pub fn parse_csv_row(line: &str) -> Vec<String> {
    parse_csv_records(line)
        .into_iter()
        .next()
        .unwrap_or_else(|| vec![String::new()])
}

/// Parse CSV text into records
///
/// Quoted fields may contain commas, doubled quotes and line breaks; a line
/// break only ends a record outside quotes. `\r\n` line endings are accepted.
pub fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Double quote inside quoted field - add a single quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                record.push(std::mem::take(&mut current_field));
                records.push(std::mem::take(&mut record));
            }
            _ => current_field.push(c),
        }
    }

    // Last record without a trailing newline
    if !current_field.is_empty() || !record.is_empty() {
        record.push(current_field);
        records.push(record);
    }
    records
}
