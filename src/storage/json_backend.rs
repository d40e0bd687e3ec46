use chrono::{DateTime, NaiveDateTime, Utc};
use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{errors::FinanceError, state::AppState};

use super::StateStore;
use crate::errors::Result;

const STATE_FILE: &str = "state.json";
const BACKUP_DIR: &str = "backups";
const BACKUP_PREFIX: &str = "state";
const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// File-backed store: one JSON state file plus rotating backups of the
/// previous versions.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    state_file: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: PathBuf, retention: Option<usize>) -> Result<Self> {
        fs::create_dir_all(&root)?;
        let backups_dir = root.join(BACKUP_DIR);
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            state_file: root.join(STATE_FILE),
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_file
    }

    pub fn backup_path(&self, backup_name: &str) -> PathBuf {
        self.backups_dir.join(backup_name)
    }

    /// Writes a snapshot of `state` into the backup directory and returns its file name.
    pub fn backup(&self, state: &AppState, note: Option<&str>) -> Result<String> {
        fs::create_dir_all(&self.backups_dir)?;
        let name = self.next_backup_name(note);
        let json = serde_json::to_string_pretty(state)?;
        write_atomic(&self.backup_path(&name), &json)?;
        self.prune_backups()?;
        Ok(name)
    }

    /// Lists backup file names, newest first.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by_key(|name| Reverse((parse_backup_timestamp(name), name.clone())));
        Ok(entries)
    }

    /// Replaces the current state file with a backup and returns the restored state.
    pub fn restore(&self, backup_name: &str) -> Result<AppState> {
        let backup_path = self.backup_path(backup_name);
        if !backup_path.exists() {
            return Err(FinanceError::StorageError(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let state = load_state_from_path(&backup_path)?;
        save_state_to_path(&state, &self.state_file)?;
        Ok(state)
    }

    fn backup_existing_file(&self) -> Result<()> {
        if !self.state_file.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.backups_dir)?;
        let backup_path = self.backup_path(&self.next_backup_name(None));
        fs::copy(&self.state_file, backup_path)?;
        self.prune_backups()
    }

    /// First unused backup name. Backups taken within the same second get a
    /// counter suffix instead of overwriting each other.
    fn next_backup_name(&self, note: Option<&str>) -> String {
        self.free_backup_name(&backup_stem(note))
    }

    fn free_backup_name(&self, stem: &str) -> String {
        let mut name = format!("{}.{}", stem, BACKUP_EXTENSION);
        let mut counter = 2;
        while self.backup_path(&name).exists() {
            name = format!("{}_{:02}.{}", stem, counter, BACKUP_EXTENSION);
            counter += 1;
        }
        name
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        for entry in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(self.backup_path(entry)) {
                tracing::warn!(backup = %entry, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl StateStore for JsonStorage {
    fn save(&self, state: &AppState) -> Result<()> {
        self.backup_existing_file()?;
        save_state_to_path(state, &self.state_file)
    }

    fn load(&self) -> Result<Option<AppState>> {
        if !self.state_file.exists() {
            return Ok(None);
        }
        let state = load_state_from_path(&self.state_file)?;
        for warning in state.warnings() {
            tracing::warn!("{}", warning);
        }
        Ok(Some(state))
    }
}

/// Serializes `state` to a sibling temp file and renames it over `path`.
pub fn save_state_to_path(state: &AppState, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_state_from_path(path: &Path) -> Result<AppState> {
    let data = fs::read_to_string(path)?;
    let state: AppState = serde_json::from_str(&data)?;
    Ok(state)
}

fn backup_stem(note: Option<&str>) -> String {
    let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let mut stem = format!("{}_{}", BACKUP_PREFIX, timestamp);
    if let Some(label) = sanitize_backup_note(note) {
        stem.push('_');
        stem.push_str(&label);
    }
    stem
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_'))
            && !sanitized.is_empty()
            && !last_dash
        {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Extracts the timestamp from `state_YYYYMMDD_HHMMSS[_note].json`.
fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let mut parts = stem.split('_');
    if parts.next()? != BACKUP_PREFIX {
        return None;
    }
    let date_part = parts.next()?;
    let time_part = parts.next()?;
    if !is_digits(date_part, 8) || !is_digits(time_part, 6) {
        return None;
    }
    let raw = format!("{}{}", date_part, time_part);
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
