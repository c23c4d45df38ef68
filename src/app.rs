use std::collections::HashSet;

use serde::Serialize;

use crate::audit::{AuditWriter, ErrorLog};
use crate::domain::{InstallState, RequiredMod, ResolvedMod};
use crate::error::SyncError;
use crate::search::WorkshopSearch;
use crate::steamcmd::{self, RetryPolicy, WorkshopDownloader};
use crate::store::ModStore;

pub const REASON_ALREADY_INSTALLED: &str = "already installed";
pub const REASON_CANCELLED: &str = "cancelled";
pub const REASON_DRY_RUN: &str = "dry run";
pub const REASON_UNRESOLVED: &str = "identifier not resolved";

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModOutcome {
    pub package_id: String,
    pub steam_id: Option<String>,
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub overall_success: bool,
    pub outcomes: Vec<ModOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    pub package_id: String,
    pub steam_id: Option<String>,
    pub name: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
}

/// Asked once per run, before the first download. Anything but an explicit
/// yes is a decline.
pub trait ConfirmGate {
    fn confirm_download(&self, missing: &[ResolvedMod]) -> bool;
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<S: WorkshopSearch, D: WorkshopDownloader> {
    store: ModStore,
    search: S,
    downloader: D,
    audit: AuditWriter,
    error_log: ErrorLog,
    retry: RetryPolicy,
}

impl<S: WorkshopSearch, D: WorkshopDownloader> App<S, D> {
    pub fn new(
        store: ModStore,
        search: S,
        downloader: D,
        audit: AuditWriter,
        error_log: ErrorLog,
    ) -> Self {
        Self {
            store,
            search,
            downloader,
            audit,
            error_log,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reconciles the save's mod list against local state and drives the
    /// downloader for whatever is missing. Every deduplicated input entry
    /// shows up in exactly one outcome of the returned report.
    pub fn sync(
        &self,
        mods: Vec<RequiredMod>,
        confirm: &dyn ConfirmGate,
        options: SyncOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        if !self.downloader.is_installed() {
            return Err(SyncError::MissingTool(
                "steamcmd is not installed at the configured path".to_string(),
            ));
        }

        let items = dedupe(mods);
        let mut outcomes: Vec<(usize, ModOutcome)> = Vec::with_capacity(items.len());

        // A failed lookup parks the entry in the unresolved set and keeps it
        // away from the classifier and the driver for the rest of the run.
        let mut unresolved: Vec<RequiredMod> = Vec::new();
        let mut resolved: Vec<(usize, ResolvedMod)> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match &item.steam_id {
                Some(id) => resolved.push((index, item.with_steam_id(id.clone()))),
                None => {
                    sink.event(ProgressEvent {
                        message: format!("phase=Resolve; searching workshop for {}", item.name),
                    });
                    match self.search.resolve_by_name(&item.name) {
                        Ok(Some(id)) => resolved.push((index, item.with_steam_id(id))),
                        Ok(None) => {
                            let message = "no workshop entry with a matching title";
                            self.error_log
                                .append(&item.package_id, &item.name, message, None);
                            outcomes.push((index, unresolved_outcome(item, message)));
                            unresolved.push(item.clone());
                        }
                        Err(err) => {
                            let message = err.to_string();
                            self.error_log
                                .append(&item.package_id, &item.name, &message, None);
                            outcomes.push((index, unresolved_outcome(item, &message)));
                            unresolved.push(item.clone());
                        }
                    }
                }
            }
        }

        sink.event(ProgressEvent {
            message: "phase=Classify; probing mods directory and workshop cache".to_string(),
        });
        let mut present: Vec<(usize, ResolvedMod)> = Vec::new();
        let mut missing: Vec<(usize, ResolvedMod)> = Vec::new();
        for (index, item) in resolved {
            match self.store.classify(&item.steam_id) {
                InstallState::Missing => missing.push((index, item)),
                InstallState::Installed | InstallState::Cached => present.push((index, item)),
            }
        }

        let missing_mods: Vec<RequiredMod> = missing.iter().map(|(_, m)| m.as_required()).collect();
        self.audit.write_missing(&missing_mods)?;
        self.audit.write_unresolved(&unresolved)?;

        if missing.is_empty() {
            for (index, item) in &present {
                outcomes.push((*index, skipped_success(item)));
            }
            return Ok(finish(outcomes));
        }

        if options.dry_run {
            for (index, item) in &present {
                outcomes.push((*index, skipped_success(item)));
            }
            for (index, item) in &missing {
                outcomes.push((*index, failure(item, REASON_DRY_RUN, None)));
            }
            return Ok(finish(outcomes));
        }

        let missing_items: Vec<ResolvedMod> = missing.iter().map(|(_, m)| m.clone()).collect();
        if !confirm.confirm_download(&missing_items) {
            for (index, item) in present.iter().chain(missing.iter()) {
                outcomes.push((*index, failure(item, REASON_CANCELLED, None)));
            }
            return Ok(finish(outcomes));
        }

        for (index, item) in &present {
            outcomes.push((*index, skipped_success(item)));
        }

        // Strictly serial: steamcmd serializes its own login session, and a
        // single writer keeps its working directory consistent.
        for (index, item) in &missing {
            sink.event(ProgressEvent {
                message: format!("phase=Download; fetching {} ({})", item.name, item.steam_id),
            });
            match steamcmd::acquire(&self.store, &self.downloader, &self.error_log, item, self.retry)
            {
                Ok(action) => outcomes.push((*index, acquired(item, action.describe()))),
                Err(err) => outcomes.push((*index, download_failure(item, &err.to_string()))),
            }
        }

        Ok(finish(outcomes))
    }

    /// Classification-only view of the save's mod list. No network, no
    /// subprocess, no writes.
    pub fn status(&self, mods: Vec<RequiredMod>, sink: &dyn ProgressSink) -> StatusReport {
        sink.event(ProgressEvent {
            message: "phase=Classify; probing mods directory and workshop cache".to_string(),
        });
        let entries = dedupe(mods)
            .into_iter()
            .map(|item| {
                let state = match &item.steam_id {
                    None => "unknown id",
                    Some(id) => match self.store.classify(id) {
                        InstallState::Installed => "installed",
                        InstallState::Cached => "cached",
                        InstallState::Missing => "missing",
                    },
                };
                StatusEntry {
                    state: state.to_string(),
                    steam_id: item.steam_id.map(|id| id.as_str().to_string()),
                    package_id: item.package_id,
                    name: item.name,
                }
            })
            .collect();
        StatusReport { entries }
    }
}

fn dedupe(mods: Vec<RequiredMod>) -> Vec<RequiredMod> {
    let mut seen = HashSet::new();
    mods.into_iter()
        .filter(|entry| seen.insert(entry.dedup_key()))
        .collect()
}

fn finish(mut pairs: Vec<(usize, ModOutcome)>) -> SyncReport {
    pairs.sort_unstable_by_key(|(index, _)| *index);
    let outcomes: Vec<ModOutcome> = pairs.into_iter().map(|(_, outcome)| outcome).collect();
    SyncReport {
        overall_success: outcomes.iter().all(|outcome| outcome.success),
        outcomes,
    }
}

fn unresolved_outcome(item: &RequiredMod, error: &str) -> ModOutcome {
    ModOutcome {
        package_id: item.package_id.clone(),
        steam_id: None,
        name: item.name.clone(),
        success: false,
        skipped: false,
        reason: Some(REASON_UNRESOLVED.to_string()),
        error: Some(error.to_string()),
    }
}

fn skipped_success(item: &ResolvedMod) -> ModOutcome {
    ModOutcome {
        package_id: item.package_id.clone(),
        steam_id: Some(item.steam_id.as_str().to_string()),
        name: item.name.clone(),
        success: true,
        skipped: true,
        reason: Some(REASON_ALREADY_INSTALLED.to_string()),
        error: None,
    }
}

fn acquired(item: &ResolvedMod, reason: &str) -> ModOutcome {
    ModOutcome {
        package_id: item.package_id.clone(),
        steam_id: Some(item.steam_id.as_str().to_string()),
        name: item.name.clone(),
        success: true,
        skipped: false,
        reason: Some(reason.to_string()),
        error: None,
    }
}

fn failure(item: &ResolvedMod, reason: &str, error: Option<&str>) -> ModOutcome {
    ModOutcome {
        package_id: item.package_id.clone(),
        steam_id: Some(item.steam_id.as_str().to_string()),
        name: item.name.clone(),
        success: false,
        skipped: false,
        reason: Some(reason.to_string()),
        error: error.map(|text| text.to_string()),
    }
}

fn download_failure(item: &ResolvedMod, error: &str) -> ModOutcome {
    ModOutcome {
        package_id: item.package_id.clone(),
        steam_id: Some(item.steam_id.as_str().to_string()),
        name: item.name.clone(),
        success: false,
        skipped: false,
        reason: None,
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;

    use camino::Utf8PathBuf;

    use crate::audit::{MISSING_FILE, UNRESOLVED_FILE};
    use crate::domain::WorkshopId;
    use crate::steamcmd::{SUCCESS_MARKER, ToolOutput};

    use super::*;

    struct MockSearch {
        titles: HashMap<String, WorkshopId>,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl MockSearch {
        fn empty() -> Self {
            Self {
                titles: HashMap::new(),
                fail: false,
                calls: Mutex::new(0),
            }
        }

        fn with(titles: &[(&str, &str)]) -> Self {
            Self {
                titles: titles
                    .iter()
                    .map(|(name, id)| (name.to_string(), id.parse().unwrap()))
                    .collect(),
                fail: false,
                calls: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                titles: HashMap::new(),
                fail: true,
                calls: Mutex::new(0),
            }
        }
    }

    impl WorkshopSearch for MockSearch {
        fn resolve_by_name(&self, name: &str) -> Result<Option<WorkshopId>, SyncError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(SyncError::SearchHttp("connection refused".to_string()));
            }
            Ok(self.titles.get(name).cloned())
        }
    }

    struct MockDownloader {
        installed: bool,
        succeed: bool,
        payload_root: Utf8PathBuf,
        calls: Mutex<u32>,
    }

    impl MockDownloader {
        fn new(payload_root: Utf8PathBuf, succeed: bool) -> Self {
            Self {
                installed: true,
                succeed,
                payload_root,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl WorkshopDownloader for MockDownloader {
        fn is_installed(&self) -> bool {
            self.installed
        }

        fn download_item(&self, id: &WorkshopId) -> Result<ToolOutput, SyncError> {
            *self.calls.lock().unwrap() += 1;
            if self.succeed {
                let dir = self.payload_root.join(id.as_str());
                fs::create_dir_all(dir.as_std_path()).unwrap();
                fs::write(dir.join("About.xml").as_std_path(), b"<ModMetaData/>").unwrap();
                Ok(ToolOutput {
                    exit_ok: true,
                    stdout: format!("{SUCCESS_MARKER} {id}\n"),
                    stderr: String::new(),
                })
            } else {
                Ok(ToolOutput {
                    exit_ok: false,
                    stdout: String::new(),
                    stderr: "ERROR! Download item failed (Failure).".to_string(),
                })
            }
        }
    }

    struct Accept {
        asked: Mutex<bool>,
    }
    impl Accept {
        fn new() -> Self {
            Self {
                asked: Mutex::new(false),
            }
        }
    }
    impl ConfirmGate for Accept {
        fn confirm_download(&self, _missing: &[ResolvedMod]) -> bool {
            *self.asked.lock().unwrap() = true;
            true
        }
    }

    struct Decline;
    impl ConfirmGate for Decline {
        fn confirm_download(&self, _missing: &[ResolvedMod]) -> bool {
            false
        }
    }

    struct NullSink;
    impl ProgressSink for NullSink {
        fn event(&self, _event: ProgressEvent) {}
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        store: ModStore,
        audit_dir: Utf8PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let mods_root = Utf8PathBuf::from_path_buf(temp.path().join("Mods")).unwrap();
        let steamcmd_dir = Utf8PathBuf::from_path_buf(temp.path().join("steamcmd")).unwrap();
        let audit_dir = Utf8PathBuf::from_path_buf(temp.path().join("audit")).unwrap();
        let store = ModStore::new(mods_root, &steamcmd_dir, "294100");
        Fixture {
            _temp: temp,
            store,
            audit_dir,
        }
    }

    fn app_with<S: WorkshopSearch, D: WorkshopDownloader>(
        fixture: &Fixture,
        search: S,
        downloader: D,
    ) -> App<S, D> {
        App::new(
            fixture.store.clone(),
            search,
            downloader,
            AuditWriter::new(fixture.audit_dir.clone()),
            ErrorLog::new(fixture.audit_dir.join("errors.log")),
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            delay: std::time::Duration::ZERO,
        })
    }

    fn known(package_id: &str, steam_id: &str, name: &str) -> RequiredMod {
        RequiredMod {
            package_id: package_id.to_string(),
            steam_id: Some(steam_id.parse().unwrap()),
            name: name.to_string(),
        }
    }

    fn unknown(package_id: &str, name: &str) -> RequiredMod {
        RequiredMod {
            package_id: package_id.to_string(),
            steam_id: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn missing_tool_aborts_before_any_item() {
        let fixture = fixture();
        let mut downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        downloader.installed = false;
        let search = MockSearch::failing();
        let app = app_with(&fixture, search, downloader);

        let err = app
            .sync(
                vec![unknown("a.b", "A Mod")],
                &Accept::new(),
                SyncOptions::default(),
                &NullSink,
            )
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingTool(_)));
        assert_eq!(*app.search.calls.lock().unwrap(), 0);
    }

    #[test]
    fn every_input_item_has_exactly_one_outcome() {
        let fixture = fixture();
        let installed = known("a.installed", "100", "Installed Mod");
        fs::create_dir_all(
            fixture
                .store
                .mod_dir(installed.steam_id.as_ref().unwrap())
                .as_std_path(),
        )
        .unwrap();

        let mods = vec![
            installed,
            known("a.missing", "200", "Missing Mod"),
            unknown("a.unresolved", "Nowhere Mod"),
        ];
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);

        let report = app
            .sync(mods, &Accept::new(), SyncOptions::default(), &NullSink)
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.outcomes[0].package_id, "a.installed");
        assert_eq!(report.outcomes[1].package_id, "a.missing");
        assert_eq!(report.outcomes[2].package_id, "a.unresolved");
    }

    #[test]
    fn duplicates_collapse_to_a_single_outcome() {
        let fixture = fixture();
        let mods = vec![
            known("a.mod", "100", "A Mod"),
            known("a.mod", "100", "A Mod"),
        ];
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);

        let report = app
            .sync(mods, &Accept::new(), SyncOptions::default(), &NullSink)
            .unwrap();

        assert_eq!(report.outcomes.len(), 1);
    }

    #[test]
    fn unresolved_item_never_reaches_the_driver_and_lands_in_the_audit_file() {
        let fixture = fixture();
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);

        let report = app
            .sync(
                vec![unknown("a.ghost", "Ghost Mod")],
                &Accept::new(),
                SyncOptions::default(),
                &NullSink,
            )
            .unwrap();

        assert_eq!(app.downloader.calls(), 0);
        assert!(!report.overall_success);
        assert_eq!(
            report.outcomes[0].reason.as_deref(),
            Some(REASON_UNRESOLVED)
        );

        let text = fs::read_to_string(fixture.audit_dir.join(UNRESOLVED_FILE)).unwrap();
        assert!(text.contains("Ghost Mod"));
        assert!(text.contains("total: 1"));
    }

    #[test]
    fn resolver_transport_error_parks_the_item_too() {
        let fixture = fixture();
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::failing(), downloader);

        let report = app
            .sync(
                vec![unknown("a.ghost", "Ghost Mod")],
                &Accept::new(),
                SyncOptions::default(),
                &NullSink,
            )
            .unwrap();

        assert_eq!(app.downloader.calls(), 0);
        assert!(report.outcomes[0].error.as_deref().unwrap().contains("connection refused"));
    }

    #[test]
    fn resolved_name_is_bound_and_downloaded() {
        let fixture = fixture();
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(
            &fixture,
            MockSearch::with(&[("Found Mod", "300")]),
            downloader,
        );

        let report = app
            .sync(
                vec![unknown("a.found", "Found Mod")],
                &Accept::new(),
                SyncOptions::default(),
                &NullSink,
            )
            .unwrap();

        assert!(report.overall_success);
        assert_eq!(report.outcomes[0].steam_id.as_deref(), Some("300"));
        assert_eq!(report.outcomes[0].reason.as_deref(), Some("downloaded"));
        assert!(
            fixture
                .store
                .mod_dir(&"300".parse().unwrap())
                .join("About.xml")
                .as_std_path()
                .is_file()
        );
    }

    #[test]
    fn nothing_missing_skips_confirmation_and_downloads() {
        let fixture = fixture();
        let entry = known("a.mod", "100", "A Mod");
        fs::create_dir_all(
            fixture
                .store
                .mod_dir(entry.steam_id.as_ref().unwrap())
                .as_std_path(),
        )
        .unwrap();

        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);
        let gate = Accept::new();

        let report = app
            .sync(vec![entry], &gate, SyncOptions::default(), &NullSink)
            .unwrap();

        assert!(report.overall_success);
        assert!(!*gate.asked.lock().unwrap());
        assert_eq!(app.downloader.calls(), 0);
        assert!(report.outcomes[0].skipped);
        assert_eq!(
            report.outcomes[0].reason.as_deref(),
            Some(REASON_ALREADY_INSTALLED)
        );
    }

    #[test]
    fn cached_item_counts_as_present() {
        let fixture = fixture();
        let entry = known("a.mod", "100", "A Mod");
        fs::create_dir_all(
            fixture
                .store
                .cache_dir(entry.steam_id.as_ref().unwrap())
                .as_std_path(),
        )
        .unwrap();

        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);

        let report = app
            .sync(vec![entry], &Accept::new(), SyncOptions::default(), &NullSink)
            .unwrap();

        assert!(report.overall_success);
        assert_eq!(app.downloader.calls(), 0);
        assert!(report.outcomes[0].skipped);
    }

    #[test]
    fn decline_cancels_every_outcome_and_downloads_nothing() {
        let fixture = fixture();
        let installed = known("a.installed", "100", "Installed Mod");
        fs::create_dir_all(
            fixture
                .store
                .mod_dir(installed.steam_id.as_ref().unwrap())
                .as_std_path(),
        )
        .unwrap();

        let mods = vec![installed, known("a.missing", "200", "Missing Mod")];
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);

        let report = app
            .sync(mods, &Decline, SyncOptions::default(), &NullSink)
            .unwrap();

        assert_eq!(app.downloader.calls(), 0);
        assert!(!report.overall_success);
        assert_eq!(report.outcomes.len(), 2);
        for outcome in &report.outcomes {
            assert!(!outcome.success);
            assert_eq!(outcome.reason.as_deref(), Some(REASON_CANCELLED));
        }
    }

    #[test]
    fn failed_download_does_not_abort_remaining_items() {
        let fixture = fixture();

        // Succeeds for id 200, fails for id 201.
        struct HalfDownloader {
            payload_root: Utf8PathBuf,
            calls: Mutex<u32>,
        }
        impl WorkshopDownloader for HalfDownloader {
            fn is_installed(&self) -> bool {
                true
            }
            fn download_item(&self, id: &WorkshopId) -> Result<ToolOutput, SyncError> {
                *self.calls.lock().unwrap() += 1;
                if id.as_str() == "200" {
                    let dir = self.payload_root.join(id.as_str());
                    fs::create_dir_all(dir.as_std_path()).unwrap();
                    Ok(ToolOutput {
                        exit_ok: true,
                        stdout: format!("{SUCCESS_MARKER} {id}\n"),
                        stderr: String::new(),
                    })
                } else {
                    Ok(ToolOutput {
                        exit_ok: false,
                        stdout: String::new(),
                        stderr: "ERROR! Timeout downloading item".to_string(),
                    })
                }
            }
        }

        let downloader = HalfDownloader {
            payload_root: fixture.store.workshop_root().to_owned(),
            calls: Mutex::new(0),
        };
        let app = app_with(&fixture, MockSearch::empty(), downloader);

        let mods = vec![
            known("a.bad", "201", "Bad Mod"),
            known("a.good", "200", "Good Mod"),
        ];
        let report = app
            .sync(mods, &Accept::new(), SyncOptions::default(), &NullSink)
            .unwrap();

        assert!(!report.overall_success);
        assert_eq!(report.outcomes[0].success, false);
        assert!(report.outcomes[0].error.is_some());
        assert_eq!(report.outcomes[1].success, true);
    }

    #[test]
    fn missing_audit_file_reflects_only_the_current_run() {
        let fixture = fixture();
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), false);
        let app = app_with(&fixture, MockSearch::empty(), downloader).with_retry_policy(
            RetryPolicy {
                max_attempts: 1,
                delay: std::time::Duration::ZERO,
            },
        );

        app.sync(
            vec![known("a.first", "100", "First Mod")],
            &Decline,
            SyncOptions::default(),
            &NullSink,
        )
        .unwrap();
        app.sync(
            vec![known("a.second", "200", "Second Mod")],
            &Decline,
            SyncOptions::default(),
            &NullSink,
        )
        .unwrap();

        let text = fs::read_to_string(fixture.audit_dir.join(MISSING_FILE)).unwrap();
        assert!(text.contains("Second Mod"));
        assert!(!text.contains("First Mod"));
    }

    #[test]
    fn dry_run_reports_missing_as_failures_without_prompting() {
        let fixture = fixture();
        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::empty(), downloader);
        let gate = Accept::new();

        let report = app
            .sync(
                vec![known("a.missing", "200", "Missing Mod")],
                &gate,
                SyncOptions { dry_run: true },
                &NullSink,
            )
            .unwrap();

        assert!(!*gate.asked.lock().unwrap());
        assert_eq!(app.downloader.calls(), 0);
        assert!(!report.overall_success);
        assert_eq!(report.outcomes[0].reason.as_deref(), Some(REASON_DRY_RUN));
    }

    #[test]
    fn status_reports_state_without_touching_collaborators() {
        let fixture = fixture();
        let installed = known("a.installed", "100", "Installed Mod");
        fs::create_dir_all(
            fixture
                .store
                .mod_dir(installed.steam_id.as_ref().unwrap())
                .as_std_path(),
        )
        .unwrap();
        let cached = known("a.cached", "200", "Cached Mod");
        fs::create_dir_all(
            fixture
                .store
                .cache_dir(cached.steam_id.as_ref().unwrap())
                .as_std_path(),
        )
        .unwrap();

        let downloader = MockDownloader::new(fixture.store.workshop_root().to_owned(), true);
        let app = app_with(&fixture, MockSearch::failing(), downloader);

        let mods = vec![
            installed,
            cached,
            known("a.missing", "300", "Missing Mod"),
            unknown("a.unknown", "Unknown Mod"),
        ];
        let report = app.status(mods, &NullSink);

        let states: Vec<&str> = report.entries.iter().map(|e| e.state.as_str()).collect();
        assert_eq!(states, vec!["installed", "cached", "missing", "unknown id"]);
        assert_eq!(*app.search.calls.lock().unwrap(), 0);
        assert_eq!(app.downloader.calls(), 0);
    }
}
