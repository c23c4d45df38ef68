use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("invalid workshop file id: {0}")]
    InvalidWorkshopId(String),

    #[error("no save file given on the command line or in modsync.json")]
    MissingSaveFile,

    #[error("failed to read save file at {0}")]
    SaveRead(PathBuf),

    #[error("malformed mod list in save file: {0}")]
    SaveParse(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("workshop search request failed: {0}")]
    SearchHttp(String),

    #[error("workshop search returned status {status}: {message}")]
    SearchStatus { status: u16, message: String },

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("steamcmd invocation failed: {0}")]
    Subprocess(String),

    #[error("download failed for workshop item {id}: {message}")]
    DownloadFailed { id: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
