use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::{InstallState, WorkshopId};
use crate::error::SyncError;

/// Read-only probes over the two directories that hold mod content: the
/// flat target mods directory and steamcmd's workshop cache.
#[derive(Debug, Clone)]
pub struct ModStore {
    mods_root: Utf8PathBuf,
    workshop_root: Utf8PathBuf,
}

impl ModStore {
    pub fn new(mods_root: Utf8PathBuf, steamcmd_dir: &Utf8Path, app_id: &str) -> Self {
        let workshop_root = steamcmd_dir
            .join("steamapps")
            .join("workshop")
            .join("content")
            .join(app_id);
        Self {
            mods_root,
            workshop_root,
        }
    }

    pub fn mods_root(&self) -> &Utf8Path {
        &self.mods_root
    }

    pub fn workshop_root(&self) -> &Utf8Path {
        &self.workshop_root
    }

    pub fn mod_dir(&self, id: &WorkshopId) -> Utf8PathBuf {
        self.mods_root.join(id.as_str())
    }

    pub fn cache_dir(&self, id: &WorkshopId) -> Utf8PathBuf {
        self.workshop_root.join(id.as_str())
    }

    pub fn ensure_mods_root(&self) -> Result<(), SyncError> {
        fs::create_dir_all(self.mods_root.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))
    }

    /// Probe errors read as "absent": a false `Missing` only costs a
    /// redundant download attempt.
    pub fn classify(&self, id: &WorkshopId) -> InstallState {
        if self.mod_dir(id).as_std_path().is_dir() {
            InstallState::Installed
        } else if self.cache_dir(id).as_std_path().is_dir() {
            InstallState::Cached
        } else {
            InstallState::Missing
        }
    }

    pub fn copy_dir_recursive(source: &Utf8Path, dest: &Utf8Path) -> Result<(), SyncError> {
        fs::create_dir_all(dest.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in walk_dir(source.as_std_path())? {
            let relative = entry.strip_prefix(source.as_std_path()).unwrap();
            let target = dest.as_std_path().join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|err| SyncError::Filesystem(err.to_string()))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                }
                fs::copy(entry, &target).map_err(|err| SyncError::Filesystem(err.to_string()))?;
            }
        }
        Ok(())
    }

    /// Copies `source` into a sibling temp directory of `dest` and renames it
    /// into place, so a crash mid-copy never leaves a half-populated mod dir.
    pub fn copy_dir_atomic(source: &Utf8Path, dest: &Utf8Path) -> Result<(), SyncError> {
        let parent = dest
            .parent()
            .ok_or_else(|| SyncError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let temp_dir = Builder::new()
            .prefix("modsync-copy")
            .tempdir_in(parent.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let temp_path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .map_err(|_| SyncError::Filesystem("invalid temp dir".to_string()))?;
        Self::copy_dir_recursive(source, &temp_path)?;
        atomic_rename_dir(temp_path.as_std_path(), dest.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path).map_err(|err| SyncError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}

pub fn atomic_rename_dir(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}
