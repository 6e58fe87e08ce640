//! Per-request session namespaces.
//!
//! Every generation request gets its own directory under the sessions root:
//!
//! ```text
//! sessions/
//! ├── 3fZq…Yb/               # one namespace per live session
//! │   ├── icons/
//! │   ├── temp/              # archive scratch space, cleared after download
//! │   └── complete.html …
//! └── .reclaim-3fZq…-x81/    # tombstone of a namespace being removed
//! ```
//!
//! Identifiers are 32 alphanumeric characters from the OS CSPRNG. They end up
//! in download URLs, so [`SessionId::parse`] accepts nothing else and a
//! caller-supplied id can never point outside the root.
//!
//! Removal renames the namespace to a tombstone first and deletes the
//! tombstone afterwards: a namespace path is either complete or gone, never
//! half-deleted. Tombstones that fail to delete are retried by every sweep.
//!
//! The [`Reclaimer`] owns the periodic sweep as a tokio task with an explicit
//! stop handle; the [`Clock`] is injected so tests can age namespaces without
//! sleeping.

use crate::config::SessionsConfig;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Length of every session identifier.
pub const SESSION_ID_LEN: usize = 32;

/// Sub-directories created inside each namespace before `allocate` returns.
pub const ICONS_DIR: &str = "icons";
pub const SCRATCH_DIR: &str = "temp";

const TOMBSTONE_PREFIX: &str = ".reclaim-";

/// Attempts before giving up on finding an unused identifier.
const ALLOCATE_ATTEMPTS: usize = 4;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid session id: {0:?}")]
    InvalidId(String),
    #[error("session {0} does not exist")]
    NotFound(SessionId),
    #[error("could not find an unused session id after {0} attempts")]
    Exhausted(usize),
}

/// Opaque, URL-safe, fixed-length session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Fresh identifier from the operating system's random source.
    pub fn generate() -> Self {
        let id: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    /// Accept only strings that [`SessionId::generate`] could have produced.
    pub fn parse(value: &str) -> Result<Self, SessionError> {
        if value.len() == SESSION_ID_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(value.to_string()))
        } else {
            Err(SessionError::InvalidId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Source of "now" for namespace ages and generation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A live session namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub namespace: PathBuf,
    pub created_at: SystemTime,
}

impl Session {
    pub fn icons_dir(&self) -> PathBuf {
        self.namespace.join(ICONS_DIR)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.namespace.join(SCRATCH_DIR)
    }
}

/// Outcome of one reclamation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Namespaces (and tombstones) removed.
    pub removed: Vec<String>,
    /// Entries that could not be removed, with the error text.
    pub failed: Vec<(String, String)>,
    /// Live namespaces younger than the TTL.
    pub kept: usize,
}

/// Allocates and reclaims session namespaces under one root directory.
pub struct SessionStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Create a fresh namespace with its `icons/` and `temp/` directories.
    ///
    /// The namespace directory itself is created with `create_dir`, which
    /// fails on an existing path, so two allocations can never share one.
    pub async fn allocate(&self) -> Result<Session, SessionError> {
        tokio::fs::create_dir_all(&self.root).await?;

        for _ in 0..ALLOCATE_ATTEMPTS {
            let id = SessionId::generate();
            let namespace = self.root.join(id.as_str());
            match tokio::fs::create_dir(&namespace).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }

            if let Err(e) = create_subdirs(&namespace).await {
                if let Err(cleanup) = remove_namespace(&self.root, &id, &namespace).await {
                    warn!(session = %id, error = %cleanup, "failed to clean up partial namespace");
                }
                return Err(e.into());
            }

            debug!(session = %id, "allocated namespace");
            return Ok(Session {
                id,
                namespace,
                created_at: self.clock.now(),
            });
        }

        Err(SessionError::Exhausted(ALLOCATE_ATTEMPTS))
    }

    /// Namespace path of a live session, `None` once it has been reclaimed.
    pub async fn namespace(&self, id: &SessionId) -> Option<PathBuf> {
        let path = self.root.join(id.as_str());
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Some(path),
            _ => None,
        }
    }

    /// Remove one session immediately, e.g. after a failed generation.
    pub async fn reclaim_now(&self, id: &SessionId) -> Result<(), SessionError> {
        let namespace = self.root.join(id.as_str());
        match remove_namespace(&self.root, id, &namespace).await {
            Ok(()) => {
                debug!(session = %id, "reclaimed namespace");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SessionError::NotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Empty a session's `temp/` directory, keeping the directory itself.
    pub async fn clear_scratch(&self, id: &SessionId) -> Result<(), SessionError> {
        let namespace = self
            .namespace(id)
            .await
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        let scratch = namespace.join(SCRATCH_DIR);
        match tokio::fs::remove_dir_all(&scratch).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir(&scratch).await?;
        Ok(())
    }

    /// Remove every namespace whose last modification is older than `max_age`.
    ///
    /// Entries that are not valid session directories are left alone;
    /// leftover tombstones are always removed. A failure on one entry is
    /// recorded and the sweep moves on.
    pub async fn reclaim_expired(&self, max_age: Duration) -> Result<ReclaimReport, SessionError> {
        let mut report = ReclaimReport::default();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e.into()),
        };
        let now = self.clock.now();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            if name.starts_with(TOMBSTONE_PREFIX) {
                match tokio::fs::remove_dir_all(&path).await {
                    Ok(()) => report.removed.push(name),
                    Err(e) => report.failed.push((name, e.to_string())),
                }
                continue;
            }

            let Ok(id) = SessionId::parse(&name) else {
                continue;
            };

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    report.failed.push((name, e.to_string()));
                    continue;
                }
            };
            // A modification time in the future counts as age zero.
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                report.kept += 1;
                continue;
            }

            match remove_namespace(&self.root, &id, &path).await {
                Ok(()) => report.removed.push(name),
                Err(e) => {
                    warn!(session = %id, error = %e, "failed to reclaim namespace");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        if !report.removed.is_empty() || !report.failed.is_empty() {
            info!(
                removed = report.removed.len(),
                failed = report.failed.len(),
                kept = report.kept,
                "session sweep finished"
            );
        }
        Ok(report)
    }
}

async fn create_subdirs(namespace: &Path) -> io::Result<()> {
    tokio::fs::create_dir(namespace.join(ICONS_DIR)).await?;
    tokio::fs::create_dir(namespace.join(SCRATCH_DIR)).await?;
    Ok(())
}

/// Rename to a tombstone, then delete the tombstone recursively.
async fn remove_namespace(root: &Path, id: &SessionId, namespace: &Path) -> io::Result<()> {
    let nonce: String = OsRng
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    let tombstone = root.join(format!("{TOMBSTONE_PREFIX}{id}-{nonce}"));
    tokio::fs::rename(namespace, &tombstone).await?;
    tokio::fs::remove_dir_all(&tombstone).await
}

/// Background task that sweeps expired namespaces on a fixed interval.
pub struct Reclaimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Reclaimer {
    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The first sweep runs immediately, then once per `interval`.
    pub fn start(store: Arc<SessionStore>, interval: Duration, ttl: Duration) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = store.reclaim_expired(ttl).await {
                            warn!(error = %e, "session sweep failed");
                        }
                    }
                }
            }
            debug!("reclaimer stopped");
        });
        Self { token, handle }
    }

    /// Start with the interval and TTL from the `[sessions]` table.
    pub fn from_config(store: Arc<SessionStore>, config: &SessionsConfig) -> Self {
        info!(
            interval_secs = config.sweep_interval_secs,
            ttl_secs = config.ttl_secs,
            "session reclaimer started"
        );
        Self::start(store, config.sweep_interval(), config.ttl())
    }

    /// Stop the loop and wait for an in-flight sweep to finish.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "reclaimer task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::set_mtime;
    use tempfile::TempDir;

    fn store_at(tmp: &TempDir, clock: Arc<dyn Clock>) -> SessionStore {
        SessionStore::new(tmp.path().join("sessions"), clock)
    }

    #[test]
    fn generated_ids_are_fixed_length_alphanumeric() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), SESSION_ID_LEN);
        assert!(id.as_str().bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn parse_rejects_traversal_and_wrong_length() {
        assert!(SessionId::parse("../../../../etc/passwd-AAAAAAAAAA").is_err());
        assert!(SessionId::parse("short").is_err());
        assert!(SessionId::parse(&"a".repeat(SESSION_ID_LEN + 1)).is_err());
        assert!(SessionId::parse(&"a".repeat(SESSION_ID_LEN)).is_ok());
    }

    #[test]
    fn session_id_serde_validates() {
        let id = SessionId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<SessionId>(r#""nope""#).is_err());
    }

    #[tokio::test]
    async fn allocate_creates_namespace_and_subdirs() {
        let tmp = TempDir::new().unwrap();
        let store = store_at(&tmp, Arc::new(SystemClock));
        let session = store.allocate().await.unwrap();

        assert!(session.namespace.is_dir());
        assert!(session.icons_dir().is_dir());
        assert!(session.scratch_dir().is_dir());
        assert_eq!(store.namespace(&session.id).await, Some(session.namespace));
    }

    #[tokio::test]
    async fn reclaim_now_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let store = store_at(&tmp, Arc::new(SystemClock));
        let session = store.allocate().await.unwrap();
        std::fs::write(session.icons_dir().join("a.png"), b"x").unwrap();

        store.reclaim_now(&session.id).await.unwrap();

        assert!(!session.namespace.exists());
        assert_eq!(store.namespace(&session.id).await, None);
        // No tombstone left behind
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn reclaim_now_unknown_session_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = store_at(&tmp, Arc::new(SystemClock));
        std::fs::create_dir_all(store.root()).unwrap();
        let result = store.reclaim_now(&SessionId::generate()).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn sweep_removes_old_and_keeps_recent() {
        let tmp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let store = store_at(&tmp, Arc::new(ManualClock::new(now)));

        let old = store.allocate().await.unwrap();
        let recent = store.allocate().await.unwrap();
        set_mtime(&old.namespace, now - Duration::from_secs(3 * 3600));
        set_mtime(&recent.namespace, now - Duration::from_secs(3600));

        let report = store
            .reclaim_expired(Duration::from_secs(2 * 3600))
            .await
            .unwrap();

        assert_eq!(report.removed, vec![old.id.to_string()]);
        assert_eq!(report.kept, 1);
        assert!(!old.namespace.exists());
        assert!(recent.namespace.exists());
    }

    #[tokio::test]
    async fn sweep_uses_injected_clock() {
        let tmp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(SystemTime::now()));
        let store = store_at(&tmp, clock.clone());
        let session = store.allocate().await.unwrap();

        let ttl = Duration::from_secs(7200);
        assert!(store.reclaim_expired(ttl).await.unwrap().removed.is_empty());

        clock.advance(Duration::from_secs(7201 + 60));
        let report = store.reclaim_expired(ttl).await.unwrap();
        assert_eq!(report.removed, vec![session.id.to_string()]);
    }

    #[tokio::test]
    async fn sweep_ignores_foreign_entries_and_removes_tombstones() {
        let tmp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(SystemTime::now()));
        let store = store_at(&tmp, clock.clone());
        std::fs::create_dir_all(store.root().join("not-a-session")).unwrap();
        std::fs::create_dir_all(store.root().join(".reclaim-leftover")).unwrap();

        clock.advance(Duration::from_secs(10 * 3600));
        let report = store.reclaim_expired(Duration::from_secs(1)).await.unwrap();

        assert_eq!(report.removed, vec![".reclaim-leftover".to_string()]);
        assert!(store.root().join("not-a-session").exists());
    }

    #[tokio::test]
    async fn sweep_of_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = store_at(&tmp, Arc::new(SystemClock));
        let report = store.reclaim_expired(Duration::from_secs(1)).await.unwrap();
        assert_eq!(report, ReclaimReport::default());
    }

    #[tokio::test]
    async fn clear_scratch_empties_temp() {
        let tmp = TempDir::new().unwrap();
        let store = store_at(&tmp, Arc::new(SystemClock));
        let session = store.allocate().await.unwrap();
        std::fs::write(session.scratch_dir().join("bundle.zip"), b"zip").unwrap();

        store.clear_scratch(&session.id).await.unwrap();

        assert!(session.scratch_dir().is_dir());
        assert_eq!(std::fs::read_dir(session.scratch_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_allocations_never_share_a_namespace() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(store_at(&tmp, Arc::new(SystemClock)));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.allocate().await.unwrap() })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            assert!(paths.insert(handle.await.unwrap().namespace));
        }
        assert_eq!(paths.len(), 50);
    }

    #[tokio::test]
    async fn reclaimer_sweeps_and_stops() {
        let tmp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(SystemTime::now()));
        let store = Arc::new(store_at(&tmp, clock.clone()));
        let session = store.allocate().await.unwrap();
        clock.advance(Duration::from_secs(3 * 3600));

        let reclaimer = Reclaimer::start(
            store.clone(),
            Duration::from_millis(10),
            Duration::from_secs(2 * 3600),
        );
        for _ in 0..100 {
            if !session.namespace.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        reclaimer.stop().await;

        assert!(!session.namespace.exists());
    }

    #[tokio::test]
    async fn reclaimer_from_config_sweeps_on_start() {
        let tmp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(SystemTime::now()));
        let store = Arc::new(store_at(&tmp, clock.clone()));
        let expired = store.allocate().await.unwrap();
        clock.advance(Duration::from_secs(3 * 3600));
        let live = store.allocate().await.unwrap();
        set_mtime(&live.namespace, clock.now());

        let config = SessionsConfig {
            root: store.root().to_path_buf(),
            ttl_secs: 2 * 3600,
            sweep_interval_secs: 3600,
        };
        let reclaimer = Reclaimer::from_config(store.clone(), &config);
        for _ in 0..100 {
            if !expired.namespace.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        reclaimer.stop().await;

        assert!(!expired.namespace.exists());
        assert!(live.namespace.exists());
    }
}
