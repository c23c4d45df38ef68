use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::Utf8PathBuf;
use chrono::Utc;

use crate::domain::RequiredMod;
use crate::error::SyncError;

pub const MISSING_FILE: &str = "missing_mods.txt";
pub const UNRESOLVED_FILE: &str = "unresolved_mods.txt";
pub const ERROR_LOG_FILE: &str = "modsync_errors.log";

const RULE_WIDTH: usize = 80;

/// Writes the two per-run audit files. Each file is fully overwritten on
/// every run, never appended.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    dir: Utf8PathBuf,
}

impl AuditWriter {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn write_missing(&self, mods: &[RequiredMod]) -> Result<(), SyncError> {
        self.write_list(MISSING_FILE, "Mods required by the save but absent locally", mods)
    }

    pub fn write_unresolved(&self, mods: &[RequiredMod]) -> Result<(), SyncError> {
        self.write_list(
            UNRESOLVED_FILE,
            "Mods whose workshop id could not be resolved by name",
            mods,
        )
    }

    fn write_list(&self, file: &str, header: &str, mods: &[RequiredMod]) -> Result<(), SyncError> {
        fs::create_dir_all(self.dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        fs::write(self.dir.join(file).as_std_path(), render_list(header, mods))
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }
}

pub fn render_list(header: &str, mods: &[RequiredMod]) -> String {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    for entry in mods {
        let id = entry
            .steam_id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| "0".to_string());
        out.push_str(&entry.name);
        out.push('\n');
        out.push_str(&format!("  package id: {}\n", entry.package_id));
        out.push_str(&format!("  workshop id: {id}\n"));
        out.push('\n');
    }
    out.push_str(&format!("total: {}\n", mods.len()));
    out
}

/// Append-only failure log shared by the resolver and the download driver.
/// Appending is best effort; a log write failure never fails the run.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: Utf8PathBuf,
}

impl ErrorLog {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, id: &str, name: &str, error: &str, detail: Option<&str>) {
        let mut entry = format!("[{}] {name} ({id})\n{error}\n", Utc::now().to_rfc3339());
        if let Some(detail) = detail {
            entry.push_str(detail.trim_end());
            entry.push('\n');
        }
        entry.push_str(&"-".repeat(RULE_WIDTH));
        entry.push('\n');
        if let Err(err) = self.try_append(&entry) {
            tracing::warn!("failed to append to {}: {err}", self.path);
        }
    }

    fn try_append(&self, entry: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent.as_std_path())?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_std_path())?;
        file.write_all(entry.as_bytes())
    }
}
