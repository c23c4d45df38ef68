use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const DEFAULT_APP_ID: &str = "294100";
pub const DEFAULT_LOGIN: &str = "anonymous";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub save_file: Option<String>,
    #[serde(default)]
    pub mods_dir: Option<String>,
    #[serde(default)]
    pub steamcmd_dir: Option<String>,
    #[serde(default)]
    pub steamcmd_exe: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub audit_dir: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub save_file: Option<Utf8PathBuf>,
    pub mods_dir: Utf8PathBuf,
    pub steamcmd_dir: Utf8PathBuf,
    pub steamcmd_exe: Option<PathBuf>,
    pub app_id: String,
    pub login: String,
    pub audit_dir: Utf8PathBuf,
    pub max_attempts: u32,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `modsync.json` from the working directory, or the given path.
    /// An absent default file resolves to all defaults; an explicitly given
    /// path must exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("modsync.json"),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SyncError> {
        let steamcmd_dir = match config.steamcmd_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => BaseDirs::new()
                .and_then(|dirs| {
                    Utf8PathBuf::from_path_buf(dirs.home_dir().join(".steamcmd")).ok()
                })
                .ok_or_else(|| {
                    SyncError::Filesystem("unable to resolve the steamcmd directory".to_string())
                })?,
        };

        Ok(ResolvedConfig {
            save_file: config.save_file.map(Utf8PathBuf::from),
            mods_dir: Utf8PathBuf::from(config.mods_dir.unwrap_or_else(|| "Mods".to_string())),
            steamcmd_dir,
            steamcmd_exe: config.steamcmd_exe.map(PathBuf::from),
            app_id: config.app_id.unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            login: config.login.unwrap_or_else(|| DEFAULT_LOGIN.to_string()),
            audit_dir: Utf8PathBuf::from(config.audit_dir.unwrap_or_else(|| ".".to_string())),
            max_attempts: config.max_attempts.unwrap_or(3),
        })
    }
}
