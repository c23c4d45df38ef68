use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Steam Workshop published-file id. Always a non-empty string of digits;
/// the save file's "0" placeholder is represented as an absent id, never as
/// a `WorkshopId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkshopId(String);

impl WorkshopId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkshopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkshopId {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && normalized != "0"
            && normalized.chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(SyncError::InvalidWorkshopId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Installed,
    Cached,
    Missing,
}

/// One entry of the save's mod list. `steam_id` is `None` when the save
/// carries the "0" placeholder and the id must be resolved by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredMod {
    pub package_id: String,
    pub steam_id: Option<WorkshopId>,
    pub name: String,
}

impl RequiredMod {
    pub fn dedup_key(&self) -> (String, String) {
        let id = self
            .steam_id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| "0".to_string());
        (self.package_id.clone(), id)
    }

    /// Binds a resolved id onto a new record; the input entry stays as the
    /// save produced it.
    pub fn with_steam_id(&self, id: WorkshopId) -> ResolvedMod {
        ResolvedMod {
            package_id: self.package_id.clone(),
            steam_id: id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMod {
    pub package_id: String,
    pub steam_id: WorkshopId,
    pub name: String,
}

impl ResolvedMod {
    pub fn as_required(&self) -> RequiredMod {
        RequiredMod {
            package_id: self.package_id.clone(),
            steam_id: Some(self.steam_id.clone()),
            name: self.name.clone(),
        }
    }
}
