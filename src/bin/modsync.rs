use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use modsync::app::{App, ConfirmGate, SyncOptions, SyncReport};
use modsync::audit::{AuditWriter, ERROR_LOG_FILE, ErrorLog};
use modsync::config::{ConfigLoader, ResolvedConfig};
use modsync::domain::{ResolvedMod, WorkshopId};
use modsync::error::SyncError;
use modsync::output::{ConsoleProgress, JsonOutput};
use modsync::save;
use modsync::search::{WorkshopHttpClient, WorkshopSearch};
use modsync::steamcmd::{self, RetryPolicy, SteamCmd, ToolOutput, WorkshopDownloader};
use modsync::store::ModStore;

#[derive(Parser)]
#[command(name = "modsync")]
#[command(about = "Reconcile a save's mod list against the mods directory and fetch what's missing via steamcmd")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download every mod the save requires but the mods directory lacks")]
    Sync(SyncArgs),
    #[command(about = "Show the install state of every mod the save requires")]
    Status(StatusArgs),
}

#[derive(Args)]
struct SyncArgs {
    save: Option<String>,

    #[arg(long)]
    yes: bool,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    mods_dir: Option<String>,

    #[arg(long)]
    steamcmd_dir: Option<String>,
}

#[derive(Args)]
struct StatusArgs {
    save: Option<String>,

    #[arg(long)]
    mods_dir: Option<String>,

    #[arg(long)]
    steamcmd_dir: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<SyncError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::MissingSaveFile
        | SyncError::SaveRead(_)
        | SyncError::SaveParse(_)
        | SyncError::ConfigRead(_)
        | SyncError::ConfigParse(_) => 2,
        SyncError::SearchHttp(_)
        | SyncError::SearchStatus { .. }
        | SyncError::MissingTool(_)
        | SyncError::Subprocess(_)
        | SyncError::DownloadFailed { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Commands::Sync(args) => run_sync(args, config, cli.json),
        Commands::Status(args) => run_status(args, config, cli.json),
    }
}

fn run_sync(args: SyncArgs, mut config: ResolvedConfig, json: bool) -> miette::Result<ExitCode> {
    if let Some(dir) = args.mods_dir {
        config.mods_dir = Utf8PathBuf::from(dir);
    }
    if let Some(dir) = args.steamcmd_dir {
        config.steamcmd_dir = Utf8PathBuf::from(dir);
    }

    let save_path = args
        .save
        .map(Utf8PathBuf::from)
        .or_else(|| config.save_file.clone())
        .ok_or(SyncError::MissingSaveFile)
        .into_diagnostic()?;
    let mods = save::load_required_mods(save_path.as_std_path()).into_diagnostic()?;

    let store = ModStore::new(config.mods_dir.clone(), &config.steamcmd_dir, &config.app_id);
    let search = WorkshopHttpClient::new(&config.app_id).into_diagnostic()?;
    let exe = config
        .steamcmd_exe
        .clone()
        .or_else(|| steamcmd::find_in_path("steamcmd"));
    let downloader = SteamCmd::new(
        exe,
        config.steamcmd_dir.clone(),
        config.app_id.clone(),
        config.login.clone(),
    );
    let audit = AuditWriter::new(config.audit_dir.clone());
    let error_log = ErrorLog::new(config.audit_dir.join(ERROR_LOG_FILE));
    let app = App::new(store, search, downloader, audit, error_log).with_retry_policy(
        RetryPolicy {
            max_attempts: config.max_attempts,
            ..RetryPolicy::default()
        },
    );

    let options = SyncOptions {
        dry_run: args.dry_run,
    };
    let gate: Box<dyn ConfirmGate> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(ConsolePrompt)
    };

    let report = if json {
        app.sync(mods, gate.as_ref(), options, &JsonOutput)
            .into_diagnostic()?
    } else {
        app.sync(mods, gate.as_ref(), options, &ConsoleProgress)
            .into_diagnostic()?
    };

    if json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        print_sync_summary(&report);
    }

    Ok(if report.overall_success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_status(args: StatusArgs, mut config: ResolvedConfig, json: bool) -> miette::Result<ExitCode> {
    if let Some(dir) = args.mods_dir {
        config.mods_dir = Utf8PathBuf::from(dir);
    }
    if let Some(dir) = args.steamcmd_dir {
        config.steamcmd_dir = Utf8PathBuf::from(dir);
    }

    let save_path = args
        .save
        .map(Utf8PathBuf::from)
        .or_else(|| config.save_file.clone())
        .ok_or(SyncError::MissingSaveFile)
        .into_diagnostic()?;
    let mods = save::load_required_mods(save_path.as_std_path()).into_diagnostic()?;

    let store = ModStore::new(config.mods_dir.clone(), &config.steamcmd_dir, &config.app_id);
    let audit = AuditWriter::new(config.audit_dir.clone());
    let error_log = ErrorLog::new(config.audit_dir.join(ERROR_LOG_FILE));
    let app = App::new(store, NopSearch, NopDownloader, audit, error_log);

    if json {
        let report = app.status(mods, &JsonOutput);
        JsonOutput::print_status(&report).into_diagnostic()?;
    } else {
        let report = app.status(mods, &ConsoleProgress);
        print_status_summary(&report);
    }
    Ok(ExitCode::SUCCESS)
}

struct AutoConfirm;

impl ConfirmGate for AutoConfirm {
    fn confirm_download(&self, _missing: &[ResolvedMod]) -> bool {
        true
    }
}

struct ConsolePrompt;

impl ConfirmGate for ConsolePrompt {
    fn confirm_download(&self, missing: &[ResolvedMod]) -> bool {
        eprintln!("{} mod(s) need to be downloaded:", missing.len());
        for entry in missing {
            eprintln!("  {} ({})", entry.name, entry.steam_id);
        }
        eprint!("Proceed with download? [y/N] ");
        let _ = io::stderr().flush();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        line.trim().eq_ignore_ascii_case("y")
    }
}

struct NopSearch;

impl WorkshopSearch for NopSearch {
    fn resolve_by_name(&self, _name: &str) -> Result<Option<WorkshopId>, SyncError> {
        Err(SyncError::SearchHttp(
            "search client not configured".to_string(),
        ))
    }
}

struct NopDownloader;

impl WorkshopDownloader for NopDownloader {
    fn is_installed(&self) -> bool {
        false
    }

    fn download_item(&self, _id: &WorkshopId) -> Result<ToolOutput, SyncError> {
        Err(SyncError::Subprocess(
            "steamcmd client not configured".to_string(),
        ))
    }
}

fn print_sync_summary(report: &SyncReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    let failures = report.outcomes.iter().filter(|o| !o.success).count();
    println!("{cyan}modsync summary{reset}");
    for outcome in &report.outcomes {
        let id = outcome.steam_id.as_deref().unwrap_or("?");
        if outcome.success {
            let color = if outcome.skipped { yellow } else { green };
            let reason = outcome.reason.as_deref().unwrap_or("done");
            println!("{color}  ok {} ({id}) {reason}{reset}", outcome.name);
        } else {
            let detail = outcome
                .reason
                .as_deref()
                .or(outcome.error.as_deref())
                .unwrap_or("failed");
            println!("{red}  !! {} ({id}) {detail}{reset}", outcome.name);
        }
    }
    if failures == 0 {
        println!("{green}{} mod(s) reconciled{reset}", report.outcomes.len());
    } else {
        println!("{red}{failures} of {} mod(s) failed{reset}", report.outcomes.len());
    }
}

fn print_status_summary(report: &modsync::app::StatusReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    for entry in &report.entries {
        let color = match entry.state.as_str() {
            "installed" => green,
            "cached" => yellow,
            _ => red,
        };
        let id = entry.steam_id.as_deref().unwrap_or("?");
        println!("{color}  {:<12}{reset} {} ({id})", entry.state, entry.name);
    }
    println!("{} mod(s) required by the save", report.entries.len());
}
