//! Refreshing the Config and Slides tables from a remote versioned feed.
//!
//! The feed publishes three files next to each other: `version.json`,
//! `config.csv` (comma-delimited) and `slides.csv` (pipe-delimited).
//! Preview only reads. Apply backs up the live tables, then fetches and
//! overwrites them; a failed fetch leaves the backups and the live tables
//! as they were.

use crate::delimited::{self, Delimiter};
use crate::store::{read_config, read_slides, KeyValueStore, TableStore, CONFIG_TABLE, SLIDES_TABLE};
use crate::tabular::load_slides;
use crate::types::RemoteVersionDescriptor;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Key under which the locally known data version is persisted.
pub const VERSION_KEY: &str = "deck_data_version";

/// Where the remote feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEndpoint {
    pub owner: String,
    pub repo: String,
    pub branch: String,

    /// Version assumed when nothing has been persisted yet.
    pub default_version: String,

    /// Overrides the raw GitHub URL built from owner/repo/branch.
    pub base_url: Option<String>,
}

impl SyncEndpoint {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            default_version: "0.0.0".to_string(),
            base_url: None,
        }
    }

    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Base URL all feed files hang off.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://raw.githubusercontent.com/{}/{}/{}",
                self.owner, self.repo, self.branch
            ),
        }
    }

    pub fn version_url(&self) -> String {
        format!("{}/version.json", self.base_url())
    }

    pub fn config_url(&self) -> String {
        format!("{}/config.csv", self.base_url())
    }

    pub fn slides_url(&self) -> String {
        format!("{}/slides.csv", self.base_url())
    }
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP GET. Transport failures are errors; HTTP error
/// statuses are returned as responses.
pub trait HttpFetcher {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

impl<T: HttpFetcher + ?Sized> HttpFetcher for &T {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        (**self).get(url)
    }
}

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,

    /// Delay after the first failure; the n-th failure waits n times this.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Fetch `url`, retrying failures with linear backoff.
///
/// Non-2xx responses count as failures. After `max_attempts` failures the
/// last error is returned inside [`Error::FetchExhausted`].
pub fn fetch_with_retry<F: HttpFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    policy: &RetryPolicy,
    sleep: &dyn Fn(Duration),
) -> Result<String> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        log::debug!("Fetching {} (attempt {}/{})", url, attempt, attempts);
        match fetcher.get(url) {
            Ok(response) if response.is_success() => return Ok(response.body),
            Ok(response) => {
                last_error = format!("HTTP {}: {}", response.status, response.body.trim());
            }
            Err(e) => last_error = e.to_string(),
        }
        log::warn!("Attempt {} for {} failed: {}", attempt, url, last_error);

        if attempt < attempts {
            sleep(policy.delay_after(attempt));
        }
    }

    Err(Error::FetchExhausted {
        attempts,
        last_error,
    })
}

/// Compare dot-separated numeric versions component by component.
///
/// Missing components count as 0, as do components that are not numbers,
/// so `"1.0"` equals `"1.0.0"` and `"1.2.0"` is less than `"1.10.0"`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (left, right) = (parse(a), parse(b));

    for idx in 0..left.len().max(right.len()) {
        let l = left.get(idx).copied().unwrap_or(0);
        let r = right.get(idx).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Backup suffix: UTC ISO timestamp to the second with `:` replaced by `-`.
pub fn backup_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Name of the backup copy of `table`.
pub fn backup_name(table: &str, timestamp: &str) -> String {
    format!("{}_Backup_{}", table, timestamp)
}

/// Steps a sync run passes through, recorded in its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    CheckingVersion,
    UpToDate,
    UpdateAvailable,
    ComparingData,
    Preview,
    BackingUp,
    Fetching,
    Writing,
    Done,
    Failed,
}

/// Result of checking the remote version.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionCheck {
    /// The version descriptor could not be fetched or parsed.
    Unavailable(String),
    UpToDate(RemoteVersionDescriptor),
    UpdateAvailable(RemoteVersionDescriptor),
}

/// Count-based comparison of local and remote data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataComparison {
    Compared {
        local_settings: usize,
        remote_settings: usize,
        local_slides: usize,
        remote_slides: usize,
    },
    Unavailable(String),
}

impl DataComparison {
    /// Whether the counts differ.
    pub fn differs(&self) -> bool {
        match self {
            DataComparison::Compared {
                local_settings,
                remote_settings,
                local_slides,
                remote_slides,
            } => local_settings != remote_settings || local_slides != remote_slides,
            DataComparison::Unavailable(_) => false,
        }
    }
}

/// Read-only comparison of local state against the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewReport {
    pub base_url: String,
    pub local_version: String,
    pub version_check: VersionCheck,

    /// Only filled in when an update is available.
    pub data: Option<DataComparison>,

    pub states: Vec<SyncState>,
}

impl PreviewReport {
    pub fn has_update(&self) -> bool {
        matches!(self.version_check, VersionCheck::UpdateAvailable(_))
    }
}

impl fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VERSION & UPDATE PREVIEW")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;

        match &self.version_check {
            VersionCheck::Unavailable(reason) => {
                writeln!(f, "VERSION CHECK: could not check version ({})", reason)?;
                writeln!(f)?;
            }
            VersionCheck::UpToDate(remote) | VersionCheck::UpdateAvailable(remote) => {
                writeln!(f, "VERSION CHECK:")?;
                writeln!(f, "   Current:  v{}", self.local_version)?;
                writeln!(f, "   Remote:   v{}", remote.version)?;
                if self.has_update() {
                    writeln!(f, "   Status:   Update available!")?;
                    writeln!(f, "   Released: {}", remote.release_date)?;
                    writeln!(f)?;
                    writeln!(f, "WHAT'S NEW IN v{}:", remote.version)?;
                    for change in &remote.changes {
                        writeln!(f, "   • {}", change)?;
                    }
                } else {
                    writeln!(f, "   Status:   You have the latest version")?;
                }
                writeln!(f)?;
            }
        }

        match (&self.version_check, &self.data) {
            (VersionCheck::UpdateAvailable(remote), Some(data)) => {
                match data {
                    DataComparison::Compared {
                        local_settings,
                        remote_settings,
                        local_slides,
                        remote_slides,
                    } => {
                        writeln!(f, "DATA COMPARISON:")?;
                        writeln!(
                            f,
                            "   Config:  {} settings (local) vs {} (remote)",
                            local_settings, remote_settings
                        )?;
                        writeln!(
                            f,
                            "   Slides:  {} slides (local) vs {} (remote)",
                            local_slides, remote_slides
                        )?;
                        if data.differs() {
                            writeln!(f, "   Status:  Data differences detected")?;
                        } else {
                            writeln!(f, "   Status:  Data appears current")?;
                        }
                        writeln!(f)?;
                    }
                    DataComparison::Unavailable(reason) => {
                        writeln!(f, "DATA COMPARISON: could not compare data ({})", reason)?;
                        writeln!(f)?;
                    }
                }
                writeln!(f, "RECOMMENDED ACTION:")?;
                writeln!(f, "   1. Apply updates to get v{}", remote.version)?;
                writeln!(f, "   2. Your data will be backed up automatically")?;
                writeln!(f)?;
            }
            (VersionCheck::UpdateAvailable(_), None) => {}
            _ => {
                writeln!(f, "NO UPDATES NEEDED")?;
                writeln!(f)?;
            }
        }

        write!(f, "Connected to: {}", self.base_url)
    }
}

/// What happened after backups were taken.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Live tables were replaced and the new version persisted.
    Updated {
        version: RemoteVersionDescriptor,
        settings: usize,
        slides: usize,
    },
    /// Fetching or parsing failed; live tables were not touched.
    FetchFailed { error: String },
    /// Writing failed part-way; restore from the backups.
    WriteFailed { error: String },
}

/// Result of an apply run that got past the backup step.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub backup_timestamp: String,

    /// Names of the backup tables created.
    pub backups: Vec<String>,

    pub outcome: ApplyOutcome,

    pub states: Vec<SyncState>,
}

impl ApplyReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, ApplyOutcome::Updated { .. })
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ApplyOutcome::Updated {
                version,
                settings,
                slides,
            } => {
                writeln!(f, "UPDATE SUCCESSFUL")?;
                writeln!(f, "Updated to v{}", version.version)?;
                writeln!(f)?;
                writeln!(f, "Changes applied:")?;
                writeln!(f, "   • Config: {} settings", settings)?;
                writeln!(f, "   • Slides: {} slides", slides)?;
                writeln!(f)?;
                writeln!(f, "Backup created: {}", self.backup_timestamp)?;
                if !version.changes.is_empty() {
                    writeln!(f)?;
                    writeln!(f, "What's new:")?;
                    for change in version.changes.iter().take(3) {
                        writeln!(f, "   • {}", change)?;
                    }
                }
                Ok(())
            }
            ApplyOutcome::FetchFailed { error } => {
                writeln!(f, "UPDATE FAILED")?;
                writeln!(f, "Could not fetch updates:")?;
                writeln!(f)?;
                writeln!(f, "{}", error)?;
                writeln!(f)?;
                write!(
                    f,
                    "Your data is safe: live tables were not changed. Backups created: {}",
                    self.backup_timestamp
                )
            }
            ApplyOutcome::WriteFailed { error } => {
                writeln!(f, "UPDATE FAILED")?;
                writeln!(f, "Could not write updated tables:")?;
                writeln!(f)?;
                writeln!(f, "{}", error)?;
                writeln!(f)?;
                write!(
                    f,
                    "Live tables may be partially updated. Restore from backups: {}",
                    self.backup_timestamp
                )
            }
        }
    }
}

/// Feed contents fetched and parsed ahead of any write.
struct FetchedFeeds {
    config: Vec<Vec<String>>,
    slides: Vec<Vec<String>>,
    version: RemoteVersionDescriptor,
}

/// Drives preview and apply runs against one endpoint.
pub struct UpdateSynchronizer<F> {
    endpoint: SyncEndpoint,
    fetcher: F,
    policy: RetryPolicy,
    sleep: Box<dyn Fn(Duration)>,
}

impl<F: HttpFetcher> UpdateSynchronizer<F> {
    /// Synchronizer with the default retry policy, sleeping the thread between attempts.
    pub fn new(endpoint: SyncEndpoint, fetcher: F) -> Self {
        Self {
            endpoint,
            fetcher,
            policy: RetryPolicy::default(),
            sleep: Box::new(std::thread::sleep),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace how backoff delays are waited out.
    pub fn with_sleeper(mut self, sleep: impl Fn(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn endpoint(&self) -> &SyncEndpoint {
        &self.endpoint
    }

    /// Locally known data version, or the endpoint default.
    pub fn local_version<K: KeyValueStore + ?Sized>(&self, state: &K) -> String {
        match state.get(VERSION_KEY) {
            Ok(Some(version)) if !version.trim().is_empty() => version,
            Ok(_) => self.endpoint.default_version.clone(),
            Err(e) => {
                log::warn!("Could not read stored version: {}", e);
                self.endpoint.default_version.clone()
            }
        }
    }

    fn fetch(&self, url: &str) -> Result<String> {
        fetch_with_retry(&self.fetcher, url, &self.policy, self.sleep.as_ref())
    }

    fn fetch_version(&self) -> Result<RemoteVersionDescriptor> {
        RemoteVersionDescriptor::from_json(&self.fetch(&self.endpoint.version_url())?)
    }

    /// Compare local state with the feed without changing anything.
    ///
    /// Fetch failures degrade the matching report section instead of failing.
    pub fn preview<T, K>(&self, tables: &T, state: &K) -> PreviewReport
    where
        T: TableStore + ?Sized,
        K: KeyValueStore + ?Sized,
    {
        let mut states = vec![SyncState::Idle, SyncState::CheckingVersion];
        let local_version = self.local_version(state);

        let version_check = match self.fetch_version() {
            Ok(remote) if compare_versions(&local_version, &remote.version) == Ordering::Less => {
                states.push(SyncState::UpdateAvailable);
                VersionCheck::UpdateAvailable(remote)
            }
            Ok(remote) => {
                states.push(SyncState::UpToDate);
                VersionCheck::UpToDate(remote)
            }
            Err(e) => {
                log::warn!("Version check failed: {}", e);
                VersionCheck::Unavailable(e.to_string())
            }
        };

        let data = match version_check {
            VersionCheck::UpdateAvailable(_) => {
                states.push(SyncState::ComparingData);
                Some(self.compare_data(tables).unwrap_or_else(|e| {
                    log::warn!("Data comparison failed: {}", e);
                    DataComparison::Unavailable(e.to_string())
                }))
            }
            _ => None,
        };

        states.push(SyncState::Preview);
        let report = PreviewReport {
            base_url: self.endpoint.base_url(),
            local_version,
            version_check,
            data,
            states,
        };
        log::info!("Preview report:\n{}", report);
        report
    }

    fn compare_data<T: TableStore + ?Sized>(&self, tables: &T) -> Result<DataComparison> {
        let local_settings = read_config(tables)?.len();
        let local_slides = read_slides(tables)?.len();

        let config = delimited::parse(&self.fetch(&self.endpoint.config_url())?, Delimiter::COMMA)?;
        let slides = delimited::parse(&self.fetch(&self.endpoint.slides_url())?, Delimiter::PIPE)?;

        Ok(DataComparison::Compared {
            local_settings,
            remote_settings: config.len().saturating_sub(1),
            local_slides,
            remote_slides: slides.len().saturating_sub(1),
        })
    }

    /// Back up the live tables, then replace them with the feed contents.
    ///
    /// Returns `Err` only when the backup step fails, in which case nothing
    /// else was attempted.
    pub fn apply<T, K>(&self, tables: &mut T, state: &mut K) -> Result<ApplyReport>
    where
        T: TableStore + ?Sized,
        K: KeyValueStore + ?Sized,
    {
        self.apply_with_timestamp(tables, state, &backup_timestamp(Utc::now()))
    }

    /// [`apply`](Self::apply) with an explicit backup suffix.
    pub fn apply_with_timestamp<T, K>(
        &self,
        tables: &mut T,
        state: &mut K,
        timestamp: &str,
    ) -> Result<ApplyReport>
    where
        T: TableStore + ?Sized,
        K: KeyValueStore + ?Sized,
    {
        let mut states = vec![SyncState::Idle, SyncState::BackingUp];
        let backups = create_backups(tables, timestamp)?;
        log::info!("Backup tables created with timestamp: {}", timestamp);

        states.push(SyncState::Fetching);
        let feeds = match self.fetch_feeds() {
            Ok(feeds) => feeds,
            Err(e) => {
                log::error!("Update failed: {}", e);
                states.push(SyncState::Failed);
                return Ok(ApplyReport {
                    backup_timestamp: timestamp.to_string(),
                    backups,
                    outcome: ApplyOutcome::FetchFailed {
                        error: e.to_string(),
                    },
                    states,
                });
            }
        };

        states.push(SyncState::Writing);
        let outcome = match write_feeds(tables, state, &feeds) {
            Ok(()) => {
                states.push(SyncState::Done);
                log::info!("Update applied successfully to v{}", feeds.version.version);
                ApplyOutcome::Updated {
                    settings: feeds.config.len().saturating_sub(1),
                    slides: feeds.slides.len().saturating_sub(1),
                    version: feeds.version,
                }
            }
            Err(e) => {
                log::error!("Writing updated tables failed: {}", e);
                states.push(SyncState::Failed);
                ApplyOutcome::WriteFailed {
                    error: e.to_string(),
                }
            }
        };

        Ok(ApplyReport {
            backup_timestamp: timestamp.to_string(),
            backups,
            outcome,
            states,
        })
    }

    fn fetch_feeds(&self) -> Result<FetchedFeeds> {
        let config_text = self.fetch(&self.endpoint.config_url())?;
        let slides_text = self.fetch(&self.endpoint.slides_url())?;
        let version = self.fetch_version()?;

        let config = delimited::parse(&config_text, Delimiter::COMMA)?;
        if config.is_empty() {
            return Err(Error::FeedError("config feed is empty".to_string()));
        }

        let slides = delimited::parse(&slides_text, Delimiter::PIPE)?;
        load_slides(&slides).map_err(|e| Error::FeedError(format!("slide feed rejected: {}", e)))?;

        Ok(FetchedFeeds {
            config,
            slides,
            version,
        })
    }
}

fn create_backups<T: TableStore + ?Sized>(tables: &mut T, timestamp: &str) -> Result<Vec<String>> {
    let mut backups = Vec::new();
    for table in [CONFIG_TABLE, SLIDES_TABLE] {
        let exists = tables
            .has_table(table)
            .map_err(|e| Error::BackupError(e.to_string()))?;
        if !exists {
            log::warn!("No {} table to back up", table);
            continue;
        }
        let name = backup_name(table, timestamp);
        tables
            .copy_table(table, &name)
            .map_err(|e| Error::BackupError(format!("{} -> {}: {}", table, name, e)))?;
        backups.push(name);
    }
    Ok(backups)
}

fn write_feeds<T, K>(tables: &mut T, state: &mut K, feeds: &FetchedFeeds) -> Result<()>
where
    T: TableStore + ?Sized,
    K: KeyValueStore + ?Sized,
{
    tables.write_table(CONFIG_TABLE, &feeds.config)?;
    tables.write_table(SLIDES_TABLE, &feeds.slides)?;
    state.set(VERSION_KEY, &feeds.version.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryKeyValueStore, MemoryTableStore};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    const BASE: &str = "https://feed.test/deck";

    /// Serves canned responses per URL; the last one repeats.
    #[derive(Default)]
    struct FakeFetcher {
        responses: HashMap<String, Vec<Result<HttpResponse>>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn ok(mut self, file: &str, body: &str) -> Self {
            self.responses.entry(format!("{}/{}", BASE, file)).or_default().push(Ok(HttpResponse {
                status: 200,
                body: body.to_string(),
            }));
            self
        }

        fn status(mut self, file: &str, status: u16) -> Self {
            self.responses.entry(format!("{}/{}", BASE, file)).or_default().push(Ok(HttpResponse {
                status,
                body: "nope".to_string(),
            }));
            self
        }

        fn calls_to(&self, file: &str) -> usize {
            let url = format!("{}/{}", BASE, file);
            self.calls.borrow().iter().filter(|c| **c == url).count()
        }
    }

    impl HttpFetcher for FakeFetcher {
        fn get(&self, url: &str) -> Result<HttpResponse> {
            let n = self.calls.borrow().iter().filter(|c| *c == url).count();
            self.calls.borrow_mut().push(url.to_string());
            let Some(queue) = self.responses.get(url) else {
                return Err(Error::HttpError(format!("connection refused: {}", url)));
            };
            match &queue[n.min(queue.len() - 1)] {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(Error::HttpError(e.to_string())),
            }
        }
    }

    const VERSION_JSON: &str =
        r#"{"version":"1.3.0","releaseDate":"2025-10-05","changes":["New intro","Fix typos","More charts","Extra"]}"#;
    const CONFIG_CSV: &str = "Setting,Value\nDeck Title,Remote Deck\nFooter Text,\"Acme, Inc\"\n";
    const SLIDES_CSV: &str = "order|title|bullets\n1|Intro|one, two|\n2|Next|a • b\n3|End|\n";

    fn endpoint() -> SyncEndpoint {
        SyncEndpoint::new("acme", "decks", "main")
            .with_default_version("1.2.1")
            .with_base_url(BASE)
    }

    fn local_tables() -> MemoryTableStore {
        MemoryTableStore::new()
            .with_table(CONFIG_TABLE, &[&["Setting", "Value"], &["Deck Title", "Local"]])
            .with_table(SLIDES_TABLE, &[&["order", "title"], &["1", "Only"]])
    }

    fn synchronizer(fetcher: &FakeFetcher) -> UpdateSynchronizer<&FakeFetcher> {
        UpdateSynchronizer::new(endpoint(), fetcher).with_sleeper(|_| {})
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.2.0", "1.10.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("2.0.1", "2.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.x.3", "1.0.3"), Ordering::Equal);
        assert_eq!(compare_versions("", "0"), Ordering::Equal);
    }

    #[test]
    fn test_endpoint_urls() {
        let endpoint = SyncEndpoint::new("acme", "decks", "main");
        assert_eq!(
            endpoint.version_url(),
            "https://raw.githubusercontent.com/acme/decks/main/version.json"
        );
        let custom = endpoint.with_base_url("http://localhost:8080/feed/");
        assert_eq!(custom.slides_url(), "http://localhost:8080/feed/slides.csv");
    }

    #[test]
    fn test_fetch_with_retry_linear_backoff() {
        let fetcher = FakeFetcher::default()
            .status("version.json", 503)
            .status("version.json", 500)
            .ok("version.json", VERSION_JSON);
        let delays = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&delays);

        let body = fetch_with_retry(
            &fetcher,
            &format!("{}/version.json", BASE),
            &RetryPolicy::default(),
            &move |d| recorded.borrow_mut().push(d),
        )
        .unwrap();

        assert_eq!(body, VERSION_JSON);
        assert_eq!(
            *delays.borrow(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[test]
    fn test_fetch_with_retry_exhausted() {
        let fetcher = FakeFetcher::default().status("config.csv", 404);
        let delays = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&delays);

        let err = fetch_with_retry(
            &fetcher,
            &format!("{}/config.csv", BASE),
            &RetryPolicy::default(),
            &move |d| recorded.borrow_mut().push(d),
        )
        .unwrap_err();

        match err {
            Error::FetchExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("404"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fetcher.calls_to("config.csv"), 3);
        assert_eq!(delays.borrow().len(), 2);
    }

    #[test]
    fn test_preview_reports_update_without_mutating() {
        let fetcher = FakeFetcher::default()
            .ok("version.json", VERSION_JSON)
            .ok("config.csv", CONFIG_CSV)
            .ok("slides.csv", SLIDES_CSV);
        let tables = local_tables();
        let state = MemoryKeyValueStore::new();

        let report = synchronizer(&fetcher).preview(&tables, &state);

        assert!(report.has_update());
        assert_eq!(report.local_version, "1.2.1");
        assert_eq!(
            report.data,
            Some(DataComparison::Compared {
                local_settings: crate::types::CONFIG_DEFAULTS.len() + 1,
                remote_settings: 2,
                local_slides: 1,
                remote_slides: 3,
            })
        );
        assert!(!report.states.contains(&SyncState::Writing));
        assert_eq!(tables.table_names(), vec!["Config", "Slides"]);
        assert_eq!(state.get(VERSION_KEY).unwrap(), None);

        let text = report.to_string();
        assert!(text.contains("Update available"));
        assert!(text.contains("• New intro"));
        assert!(text.contains("Data differences detected"));
    }

    #[test]
    fn test_preview_up_to_date_skips_data() {
        let fetcher = FakeFetcher::default().ok("version.json", VERSION_JSON);
        let mut state = MemoryKeyValueStore::new();
        state.set(VERSION_KEY, "1.3.0").unwrap();

        let report = synchronizer(&fetcher).preview(&local_tables(), &state);

        assert!(matches!(report.version_check, VersionCheck::UpToDate(_)));
        assert!(report.data.is_none());
        assert_eq!(fetcher.calls_to("config.csv"), 0);
        assert!(report.to_string().contains("NO UPDATES NEEDED"));
    }

    #[test]
    fn test_preview_degrades_on_fetch_failure() {
        let fetcher = FakeFetcher::default()
            .ok("version.json", VERSION_JSON)
            .status("slides.csv", 500)
            .ok("config.csv", CONFIG_CSV);

        let report = synchronizer(&fetcher).preview(&local_tables(), &MemoryKeyValueStore::new());
        assert!(matches!(report.data, Some(DataComparison::Unavailable(_))));
        assert!(report.to_string().contains("could not compare data"));

        let offline = FakeFetcher::default();
        let report = synchronizer(&offline).preview(&local_tables(), &MemoryKeyValueStore::new());
        assert!(matches!(report.version_check, VersionCheck::Unavailable(_)));
        assert!(report.to_string().contains("could not check version"));
    }

    #[test]
    fn test_apply_replaces_tables_and_persists_version() {
        let fetcher = FakeFetcher::default()
            .ok("version.json", VERSION_JSON)
            .ok("config.csv", CONFIG_CSV)
            .ok("slides.csv", SLIDES_CSV);
        let mut tables = local_tables();
        let mut state = MemoryKeyValueStore::new();

        let report = synchronizer(&fetcher)
            .apply_with_timestamp(&mut tables, &mut state, "2025-10-05T10-00-00")
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(
            report.backups,
            vec![
                "Config_Backup_2025-10-05T10-00-00",
                "Slides_Backup_2025-10-05T10-00-00"
            ]
        );
        assert_eq!(state.get(VERSION_KEY).unwrap().as_deref(), Some("1.3.0"));

        let config = read_config(&tables).unwrap();
        assert_eq!(config.deck_title(), Some("Remote Deck".to_string()));
        assert_eq!(config.footer_text(), Some("Acme, Inc".to_string()));
        let slides = read_slides(&tables).unwrap();
        assert_eq!(slides.len(), 3);
        assert_eq!(slides[0].bullets, "one, two");

        let backup = tables
            .read_table("Slides_Backup_2025-10-05T10-00-00")
            .unwrap()
            .unwrap();
        assert_eq!(backup[1], vec!["1", "Only"]);

        let text = report.to_string();
        assert!(text.contains("Updated to v1.3.0"));
        assert!(text.contains("• More charts"));
        assert!(!text.contains("• Extra"));
    }

    #[test]
    fn test_apply_fetch_failure_keeps_live_tables() {
        let fetcher = FakeFetcher::default()
            .ok("config.csv", CONFIG_CSV)
            .status("slides.csv", 502);
        let mut tables = local_tables();
        let mut state = MemoryKeyValueStore::new();

        let report = synchronizer(&fetcher)
            .apply_with_timestamp(&mut tables, &mut state, "ts")
            .unwrap();

        assert!(matches!(report.outcome, ApplyOutcome::FetchFailed { .. }));
        assert_eq!(report.states.last(), Some(&SyncState::Failed));
        assert_eq!(read_slides(&tables).unwrap()[0].title, "Only");
        assert!(tables.has_table("Config_Backup_ts").unwrap());
        assert_eq!(state.get(VERSION_KEY).unwrap(), None);
        assert!(report.to_string().contains("live tables were not changed"));
    }

    #[test]
    fn test_apply_rejects_slide_feed_without_required_columns() {
        let fetcher = FakeFetcher::default()
            .ok("version.json", VERSION_JSON)
            .ok("config.csv", CONFIG_CSV)
            .ok("slides.csv", "heading|body\nx|y\n");
        let mut tables = local_tables();

        let report = synchronizer(&fetcher)
            .apply_with_timestamp(&mut tables, &mut MemoryKeyValueStore::new(), "ts")
            .unwrap();

        assert!(matches!(report.outcome, ApplyOutcome::FetchFailed { .. }));
        assert_eq!(read_slides(&tables).unwrap()[0].title, "Only");
    }

    struct BrokenCopyStore(MemoryTableStore);

    impl TableStore for BrokenCopyStore {
        fn read_table(&self, name: &str) -> Result<Option<crate::store::Table>> {
            self.0.read_table(name)
        }

        fn write_table(&mut self, name: &str, rows: &[Vec<String>]) -> Result<()> {
            self.0.write_table(name, rows)
        }

        fn copy_table(&mut self, _from: &str, _to: &str) -> Result<()> {
            Err(Error::TableError("disk full".to_string()))
        }
    }

    #[test]
    fn test_apply_aborts_when_backup_fails() {
        let fetcher = FakeFetcher::default()
            .ok("version.json", VERSION_JSON)
            .ok("config.csv", CONFIG_CSV)
            .ok("slides.csv", SLIDES_CSV);
        let mut tables = BrokenCopyStore(local_tables());

        let err = synchronizer(&fetcher)
            .apply_with_timestamp(&mut tables, &mut MemoryKeyValueStore::new(), "ts")
            .unwrap_err();

        assert!(matches!(err, Error::BackupError(_)));
        assert_eq!(fetcher.calls.borrow().len(), 0);
        assert_eq!(read_config(&tables).unwrap().deck_title(), Some("Local".to_string()));
    }
}
