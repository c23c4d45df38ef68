use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::audit::ErrorLog;
use crate::domain::{InstallState, ResolvedMod, WorkshopId};
use crate::error::SyncError;
use crate::store::ModStore;

/// Printed by steamcmd when a workshop download completes.
pub const SUCCESS_MARKER: &str = "Success. Downloaded item";

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

pub trait WorkshopDownloader: Send + Sync {
    fn is_installed(&self) -> bool;
    /// One opaque tool invocation; interpretation of the captured output is
    /// left entirely to the caller. `Err` means the process could not be
    /// launched at all.
    fn download_item(&self, id: &WorkshopId) -> Result<ToolOutput, SyncError>;
}

pub struct SteamCmd {
    exe: Option<PathBuf>,
    install_dir: Utf8PathBuf,
    app_id: String,
    login: String,
}

impl SteamCmd {
    pub fn new(exe: Option<PathBuf>, install_dir: Utf8PathBuf, app_id: String, login: String) -> Self {
        Self {
            exe,
            install_dir,
            app_id,
            login,
        }
    }
}

impl WorkshopDownloader for SteamCmd {
    fn is_installed(&self) -> bool {
        self.exe.as_ref().map(|exe| exe.exists()).unwrap_or(false)
    }

    fn download_item(&self, id: &WorkshopId) -> Result<ToolOutput, SyncError> {
        let exe = self
            .exe
            .as_ref()
            .ok_or_else(|| SyncError::Subprocess("steamcmd executable not located".to_string()))?;
        let output = Command::new(exe)
            .arg("+force_install_dir")
            .arg(self.install_dir.as_str())
            .arg("+login")
            .arg(&self.login)
            .arg("+workshop_download_item")
            .arg(&self.app_id)
            .arg(id.as_str())
            .arg("+quit")
            .output()
            .map_err(|err| SyncError::Subprocess(err.to_string()))?;
        Ok(ToolOutput {
            exit_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireAction {
    AlreadyInstalled,
    CopiedFromCache,
    Downloaded,
}

impl AcquireAction {
    pub fn describe(self) -> &'static str {
        match self {
            AcquireAction::AlreadyInstalled => "already installed",
            AcquireAction::CopiedFromCache => "copied from workshop cache",
            AcquireAction::Downloaded => "downloaded",
        }
    }
}

struct AttemptFailure {
    message: String,
    detail: Option<String>,
}

enum Step {
    CheckInstalled,
    CheckCached,
    Invoke,
}

/// Drives one workshop item to the installed state. Each attempt restarts at
/// the install check, since a prior attempt's side effects may have partially
/// succeeded; the attempt counter bounds the whole loop.
pub fn acquire<D: WorkshopDownloader + ?Sized>(
    store: &ModStore,
    downloader: &D,
    error_log: &ErrorLog,
    item: &ResolvedMod,
    policy: RetryPolicy,
) -> Result<AcquireAction, SyncError> {
    let mut attempt: u32 = 1;
    loop {
        match run_attempt(store, downloader, item) {
            Ok(action) => return Ok(action),
            Err(failure) => {
                tracing::warn!(
                    "attempt {attempt}/{} failed for {}: {}",
                    policy.max_attempts,
                    item.steam_id,
                    failure.message
                );
                error_log.append(
                    item.steam_id.as_str(),
                    &item.name,
                    &failure.message,
                    failure.detail.as_deref(),
                );
                if attempt >= policy.max_attempts {
                    return Err(SyncError::DownloadFailed {
                        id: item.steam_id.to_string(),
                        message: failure.message,
                    });
                }
                attempt += 1;
                thread::sleep(policy.delay);
            }
        }
    }
}

fn run_attempt<D: WorkshopDownloader + ?Sized>(
    store: &ModStore,
    downloader: &D,
    item: &ResolvedMod,
) -> Result<AcquireAction, AttemptFailure> {
    let id = &item.steam_id;
    let mut step = Step::CheckInstalled;
    loop {
        step = match step {
            Step::CheckInstalled => {
                if store.classify(id) == InstallState::Installed {
                    return Ok(AcquireAction::AlreadyInstalled);
                }
                Step::CheckCached
            }
            Step::CheckCached => {
                if store.classify(id) == InstallState::Cached {
                    return match ModStore::copy_dir_atomic(&store.cache_dir(id), &store.mod_dir(id))
                    {
                        Ok(()) => Ok(AcquireAction::CopiedFromCache),
                        Err(err) => Err(AttemptFailure {
                            message: format!(
                                "failed to copy cached mod into the mods directory: {err}"
                            ),
                            detail: None,
                        }),
                    };
                }
                Step::Invoke
            }
            Step::Invoke => {
                if let Err(err) = store.ensure_mods_root() {
                    return Err(AttemptFailure {
                        message: format!("failed to create the mods directory: {err}"),
                        detail: None,
                    });
                }
                let output = match downloader.download_item(id) {
                    Ok(output) => output,
                    Err(err) => {
                        return Err(AttemptFailure {
                            message: err.to_string(),
                            detail: None,
                        });
                    }
                };
                if !output.exit_ok || !output.stdout.contains(SUCCESS_MARKER) {
                    return Err(AttemptFailure {
                        message: "steamcmd did not report a completed download".to_string(),
                        detail: Some(diagnostics(&output)),
                    });
                }
                let payload = store.cache_dir(id);
                if !payload.as_std_path().is_dir() {
                    return Err(AttemptFailure {
                        message: format!("steamcmd reported success but {payload} does not exist"),
                        detail: Some(diagnostics(&output)),
                    });
                }
                return match ModStore::copy_dir_atomic(&payload, &store.mod_dir(id)) {
                    Ok(()) => Ok(AcquireAction::Downloaded),
                    Err(err) => Err(AttemptFailure {
                        message: format!(
                            "failed to copy downloaded mod into the mods directory: {err}"
                        ),
                        detail: None,
                    }),
                };
            }
        };
    }
}

fn diagnostics(output: &ToolOutput) -> String {
    let stdout = output.stdout.trim();
    let stderr = output.stderr.trim();
    match (stdout.is_empty(), stderr.is_empty()) {
        (true, true) => "no output captured".to_string(),
        (false, true) => format!("stdout:\n{stdout}"),
        (true, false) => format!("stderr:\n{stderr}"),
        (false, false) => format!("stdout:\n{stdout}\nstderr:\n{stderr}"),
    }
}
