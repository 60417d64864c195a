//! On-disk resource cache with at-most-once acquisition
//!
//! Maps a declared [`Resource`] to a validated local path. Acquisition for
//! a given resource identity is serialized with an exclusive advisory file
//! lock under the cache root, so concurrent runs (in-process or across
//! processes) never race on the same download: the loser blocks, then
//! reuses the winner's artifact. Checkpoints are downloaded into a `.part`
//! staging file, verified, and only then renamed into their final path —
//! a partially-written artifact is never observable under its final name.

use crate::checksum;
use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::entry::{CacheEntry, VerificationStatus};
use crate::resource::fetch::Fetcher;
use crate::resource::{Resource, ResourceKind};
use fs4::FileExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Holds the per-resource acquisition lock for as long as it lives
struct AcquisitionLock {
    _file: fs::File,
}

/// Resource cache rooted at one shared directory
pub struct ResourceCache {
    root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    download_retries: u32,
    retry_backoff: Duration,
    verify_on_reuse: bool,
}

impl ResourceCache {
    /// Create a cache over `root` using the given acquisition backend
    pub fn new(root: PathBuf, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            root,
            fetcher,
            download_retries: 3,
            retry_backoff: Duration::from_secs(2),
            verify_on_reuse: true,
        }
    }

    /// Override the bounded retry policy for network acquisition
    pub fn with_retry_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.download_retries = retries.max(1);
        self.retry_backoff = backoff;
        self
    }

    /// Control whether cached checkpoints are re-hashed before reuse
    pub fn with_verify_on_reuse(mut self, verify: bool) -> Self {
        self.verify_on_reuse = verify;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cloned code tree location for an engine
    pub fn repo_path(&self, engine: &str) -> PathBuf {
        self.root.join(engine).join("repo")
    }

    /// Checkpoint directory for an engine
    pub fn checkpoints_dir(&self, engine: &str) -> PathBuf {
        self.root.join(engine).join("checkpoints")
    }

    /// Final on-disk location for a resource's artifact
    pub fn artifact_path(&self, resource: &Resource) -> PathBuf {
        match resource.kind {
            ResourceKind::Repository => self.repo_path(&resource.engine),
            ResourceKind::Checkpoint => self.checkpoints_dir(&resource.engine).join(&resource.name),
        }
    }

    fn lock_path(&self, resource: &Resource) -> PathBuf {
        self.root
            .join(&resource.engine)
            .join(".locks")
            .join(format!("{}-{}.lock", resource.kind, resource.name))
    }

    /// Ensure a resource is present, verified, and return its local path
    ///
    /// Fast path: a verified cache hit returns immediately with no lock
    /// and no network activity. Otherwise the per-resource lock is taken,
    /// the hit check re-runs (another run may have acquired while we
    /// waited), and only then does acquisition start.
    pub async fn ensure(&self, resource: &Resource) -> LipSyncResult<PathBuf> {
        if let Some(path) = self.try_reuse(resource).await? {
            debug!("Cache hit for {}: {}", resource.id(), path.display());
            return Ok(path);
        }

        let _lock = self.lock(resource).await?;

        if let Some(path) = self.try_reuse(resource).await? {
            debug!("{} acquired by a concurrent run, reusing", resource.id());
            return Ok(path);
        }

        self.acquire(resource).await
    }

    /// Check for a reusable artifact; `None` means acquisition is needed
    async fn try_reuse(&self, resource: &Resource) -> LipSyncResult<Option<PathBuf>> {
        let artifact = self.artifact_path(resource);
        if !artifact.exists() {
            return Ok(None);
        }

        match resource.kind {
            // A repository tree has no digest requirement; present = reusable
            ResourceKind::Repository => Ok(Some(artifact)),
            ResourceKind::Checkpoint => {
                let sidecar = CacheEntry::sidecar_path(&artifact);
                let verified = CacheEntry::load(&sidecar)?
                    .map(|e| e.is_verified())
                    .unwrap_or(false);
                if !verified {
                    return Ok(None);
                }

                if self.verify_on_reuse {
                    if let Some(expected) = &resource.digest {
                        if !self.hash_matches(&artifact, expected.algorithm, &expected.value).await? {
                            warn!(
                                "Cached {} no longer matches its digest, re-acquiring",
                                resource.id()
                            );
                            return Ok(None);
                        }
                    }
                }

                Ok(Some(artifact))
            }
        }
    }

    async fn hash_matches(
        &self,
        artifact: &Path,
        algorithm: checksum::DigestAlgorithm,
        expected: &str,
    ) -> LipSyncResult<bool> {
        let artifact = artifact.to_path_buf();
        let expected = expected.to_string();
        tokio::task::spawn_blocking(move || checksum::verify(algorithm, &artifact, &expected))
            .await
            .map_err(|e| LipSyncError::Internal(format!("hashing task panicked: {e}")))?
    }

    /// Take the exclusive acquisition lock for one resource identity
    async fn lock(&self, resource: &Resource) -> LipSyncResult<AcquisitionLock> {
        let path = self.lock_path(resource);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LipSyncError::io(format!("creating {}", parent.display()), e))?;
        }

        debug!("Waiting for acquisition lock: {}", path.display());
        tokio::task::spawn_blocking(move || {
            let file = fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .map_err(|e| LipSyncError::io(format!("opening lock {}", path.display()), e))?;
            file.lock_exclusive()
                .map_err(|e| LipSyncError::io(format!("locking {}", path.display()), e))?;
            Ok(AcquisitionLock { _file: file })
        })
        .await
        .map_err(|e| LipSyncError::Internal(format!("lock task panicked: {e}")))?
    }

    /// Acquire a missing (or invalidated) resource; caller holds the lock
    async fn acquire(&self, resource: &Resource) -> LipSyncResult<PathBuf> {
        let artifact = self.artifact_path(resource);
        if let Some(parent) = artifact.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LipSyncError::io(format!("creating {}", parent.display()), e))?;
        }

        match resource.kind {
            ResourceKind::Repository => self.acquire_repository(resource, &artifact).await,
            ResourceKind::Checkpoint => self.acquire_checkpoint(resource, &artifact).await,
        }
    }

    async fn acquire_repository(
        &self,
        resource: &Resource,
        artifact: &Path,
    ) -> LipSyncResult<PathBuf> {
        let staging = staging_path(artifact);
        let mut last_error = String::new();

        for attempt in 1..=self.download_retries {
            remove_tree(&staging)?;
            remove_tree(artifact)?;

            match self.fetcher.fetch_repository(resource, &staging).await {
                Ok(()) => {
                    fs::rename(&staging, artifact).map_err(|e| {
                        LipSyncError::io(format!("installing {}", artifact.display()), e)
                    })?;
                    info!("Repository ready: {}", artifact.display());
                    return Ok(artifact.to_path_buf());
                }
                Err(e) => {
                    last_error = e.to_string();
                    self.maybe_backoff(resource, attempt, &e).await;
                }
            }
        }

        Err(self.unavailable(resource, artifact, last_error))
    }

    async fn acquire_checkpoint(
        &self,
        resource: &Resource,
        artifact: &Path,
    ) -> LipSyncResult<PathBuf> {
        let staging = staging_path(artifact);
        let sidecar = CacheEntry::sidecar_path(artifact);
        let mut last_error = String::new();
        let mut last_integrity: Option<LipSyncError> = None;

        for attempt in 1..=self.download_retries {
            remove_file_if_present(&staging)?;
            remove_file_if_present(artifact)?;
            CacheEntry::new(resource, VerificationStatus::Unverified, None).save(&sidecar)?;

            match self.fetcher.fetch_checkpoint(resource, &staging).await {
                Err(e) => {
                    last_error = e.to_string();
                    self.maybe_backoff(resource, attempt, &e).await;
                }
                Ok(()) => match self.verify_staged(resource, &staging).await? {
                    Ok(digest) => {
                        // Rename, not copy: a crash between these two steps
                        // leaves either staging or a complete artifact, never
                        // a half-written file under the final name.
                        fs::rename(&staging, artifact).map_err(|e| {
                            LipSyncError::io(format!("installing {}", artifact.display()), e)
                        })?;
                        CacheEntry::new(resource, VerificationStatus::Verified, Some(digest))
                            .save(&sidecar)?;
                        info!("Checkpoint ready: {}", artifact.display());
                        return Ok(artifact.to_path_buf());
                    }
                    Err(integrity) => {
                        remove_file_if_present(&staging)?;
                        CacheEntry::new(resource, VerificationStatus::Failed, None).save(&sidecar)?;
                        warn!(
                            "Digest mismatch for {} (attempt {}/{})",
                            resource.id(),
                            attempt,
                            self.download_retries
                        );
                        last_integrity = Some(integrity);
                        if attempt < self.download_retries {
                            tokio::time::sleep(self.backoff_delay(attempt)).await;
                        }
                    }
                },
            }
        }

        match last_integrity {
            Some(integrity) => Err(integrity),
            None => Err(self.unavailable(resource, artifact, last_error)),
        }
    }

    /// Hash the staged download; `Ok(Ok(digest))` on match,
    /// `Ok(Err(IntegrityError))` on mismatch
    async fn verify_staged(
        &self,
        resource: &Resource,
        staging: &Path,
    ) -> LipSyncResult<Result<String, LipSyncError>> {
        let Some(expected) = resource.digest.clone() else {
            // No digest requirement declared; record what we got
            let staging = staging.to_path_buf();
            let digest = tokio::task::spawn_blocking(move || {
                checksum::digest_file(checksum::DigestAlgorithm::Sha256, &staging)
            })
            .await
            .map_err(|e| LipSyncError::Internal(format!("hashing task panicked: {e}")))??;
            return Ok(Ok(digest));
        };

        let staging = staging.to_path_buf();
        let actual = tokio::task::spawn_blocking(move || {
            checksum::digest_file(expected.algorithm, &staging)
        })
        .await
        .map_err(|e| LipSyncError::Internal(format!("hashing task panicked: {e}")))??;

        if actual.eq_ignore_ascii_case(&expected.value) {
            Ok(Ok(actual))
        } else {
            Ok(Err(LipSyncError::Integrity {
                resource: resource.id(),
                expected: expected.value,
                actual,
            }))
        }
    }

    async fn maybe_backoff(&self, resource: &Resource, attempt: u32, error: &LipSyncError) {
        if attempt < self.download_retries && error.is_retryable() {
            let delay = self.backoff_delay(attempt);
            warn!(
                "Acquisition of {} failed (attempt {}/{}): {}; retrying in {:?}",
                resource.id(),
                attempt,
                self.download_retries,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    fn unavailable(&self, resource: &Resource, artifact: &Path, reason: String) -> LipSyncError {
        LipSyncError::ResourceUnavailable {
            resource: resource.id(),
            attempts: self.download_retries,
            reason,
            cache_path: artifact.to_path_buf(),
        }
    }

    /// All persisted checkpoint records under the cache root
    pub fn list_entries(&self) -> LipSyncResult<Vec<CacheEntry>> {
        let mut entries = Vec::new();
        for engine in self.engines()? {
            let dir = self.checkpoints_dir(&engine);
            if !dir.exists() {
                continue;
            }
            let read = fs::read_dir(&dir)
                .map_err(|e| LipSyncError::io(format!("reading {}", dir.display()), e))?;
            for item in read.flatten() {
                let name = item.file_name().to_string_lossy().into_owned();
                if !name.ends_with(".meta.json") {
                    continue;
                }
                if let Some(entry) = CacheEntry::load(&item.path())? {
                    entries.push(entry);
                }
            }
        }
        entries.sort_by(|a, b| (&a.engine, &a.name).cmp(&(&b.engine, &b.name)));
        Ok(entries)
    }

    /// Engine subtrees present under the cache root
    pub fn engines(&self) -> LipSyncResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let read = fs::read_dir(&self.root)
            .map_err(|e| LipSyncError::io(format!("reading {}", self.root.display()), e))?;
        let mut engines: Vec<String> = read
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        engines.sort();
        Ok(engines)
    }

    /// Re-hash one cached checkpoint against its recorded digest
    pub fn recheck_entry(&self, entry: &CacheEntry) -> LipSyncResult<bool> {
        let artifact = self.checkpoints_dir(&entry.engine).join(&entry.name);
        if !artifact.exists() {
            return Ok(false);
        }
        match (&entry.algorithm, &entry.digest) {
            (Some(algorithm), Some(digest)) => checksum::verify(*algorithm, &artifact, digest),
            _ => Ok(entry.is_verified()),
        }
    }

    /// Remove every cached artifact; returns the number of engine subtrees
    /// deleted. This is the recovery path for corrupt or stale caches.
    pub fn clear(&self) -> LipSyncResult<u32> {
        let engines = self.engines()?;
        let mut removed = 0;
        for engine in engines {
            let dir = self.root.join(&engine);
            fs::remove_dir_all(&dir)
                .map_err(|e| LipSyncError::io(format!("removing {}", dir.display()), e))?;
            removed += 1;
            info!("Removed cached engine tree: {}", dir.display());
        }
        Ok(removed)
    }
}

/// In-progress path for an artifact: `<final>.part`
///
/// Appended rather than `set_extension` so checkpoint names keep their
/// own extension (`wav2lip.pth` stages as `wav2lip.pth.part`).
fn staging_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".part");
    artifact.with_file_name(name)
}

fn remove_tree(path: &Path) -> LipSyncResult<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .map_err(|e| LipSyncError::io(format!("removing {}", path.display()), e))?;
    }
    Ok(())
}

fn remove_file_if_present(path: &Path) -> LipSyncResult<()> {
    if path.exists() {
        fs::remove_file(path)
            .map_err(|e| LipSyncError::io(format!("removing {}", path.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::DigestAlgorithm;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn sha256_hex(data: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(data))
    }

    /// Deterministic fetcher: counts calls, optionally fails the first N
    /// transfers after writing a truncated file (an interrupted download),
    /// optionally stalls to widen concurrency windows.
    struct FakeFetcher {
        payload: Vec<u8>,
        calls: AtomicU32,
        fail_first: u32,
        delay: Option<Duration>,
    }

    impl FakeFetcher {
        fn new(payload: &[u8]) -> Self {
            Self {
                payload: payload.to_vec(),
                calls: AtomicU32::new(0),
                fail_first: 0,
                delay: None,
            }
        }

        fn failing_first(mut self, n: u32) -> Self {
            self.fail_first = n;
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch_checkpoint(&self, resource: &Resource, dest: &Path) -> LipSyncResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if call < self.fail_first {
                // Interrupted mid-transfer: half the payload, then an error
                fs::write(dest, &self.payload[..self.payload.len() / 2]).unwrap();
                return Err(LipSyncError::Download {
                    url: resource.source.clone(),
                    reason: "connection reset".to_string(),
                });
            }
            fs::write(dest, &self.payload).unwrap();
            Ok(())
        }

        async fn fetch_repository(&self, _resource: &Resource, dest: &Path) -> LipSyncResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::create_dir_all(dest).unwrap();
            fs::write(dest.join("inference.py"), "# stub").unwrap();
            Ok(())
        }
    }

    const PAYLOAD: &[u8] = b"pretend this is a 400MB pytorch checkpoint";

    fn checkpoint_for(payload: &[u8]) -> Resource {
        Resource::checkpoint(
            "wav2lip",
            "wav2lip.pth",
            "https://example.com/wav2lip.pth",
            DigestAlgorithm::Sha256,
            sha256_hex(payload),
        )
    }

    fn cache_with(root: &TempDir, fetcher: Arc<FakeFetcher>) -> ResourceCache {
        ResourceCache::new(root.path().to_path_buf(), fetcher)
            .with_retry_policy(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache = cache_with(&root, fetcher.clone());
        let resource = checkpoint_for(PAYLOAD);

        let first = cache.ensure(&resource).await.unwrap();
        let second = cache.ensure(&resource).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1, "second ensure must not re-download");
        assert_eq!(fs::read(&first).unwrap(), PAYLOAD);

        let sidecar = CacheEntry::sidecar_path(&first);
        let entry = CacheEntry::load(&sidecar).unwrap().unwrap();
        assert!(entry.is_verified());
        assert_eq!(entry.digest.unwrap(), sha256_hex(PAYLOAD));
    }

    #[tokio::test]
    async fn interrupted_download_retries_and_recovers() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD).failing_first(1));
        let cache = cache_with(&root, fetcher.clone());
        let resource = checkpoint_for(PAYLOAD);

        let path = cache.ensure(&resource).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(fs::read(&path).unwrap(), PAYLOAD);
    }

    #[tokio::test]
    async fn exhausted_retries_never_leave_verified_state() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD).failing_first(u32::MAX));
        let cache = cache_with(&root, fetcher.clone());
        let resource = checkpoint_for(PAYLOAD);

        let err = cache.ensure(&resource).await.unwrap_err();
        assert!(matches!(err, LipSyncError::ResourceUnavailable { .. }));
        assert_eq!(fetcher.calls(), 3);

        let artifact = cache.artifact_path(&resource);
        assert!(!artifact.exists(), "no artifact under the final name");
        let entry = CacheEntry::load(&CacheEntry::sidecar_path(&artifact))
            .unwrap()
            .unwrap();
        assert!(!entry.is_verified());

        // A later ensure retries the full download and succeeds
        let fetcher2 = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache2 = cache_with(&root, fetcher2.clone());
        let path = cache2.ensure(&resource).await.unwrap();
        assert_eq!(fs::read(&path).unwrap(), PAYLOAD);
        assert_eq!(fetcher2.calls(), 1);
    }

    #[tokio::test]
    async fn corrupted_artifact_is_reacquired() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache = cache_with(&root, fetcher.clone());
        let resource = checkpoint_for(PAYLOAD);

        let path = cache.ensure(&resource).await.unwrap();
        fs::write(&path, b"tampered after download").unwrap();

        let again = cache.ensure(&resource).await.unwrap();

        assert_eq!(fetcher.calls(), 2, "corruption must trigger re-acquisition");
        assert_eq!(fs::read(&again).unwrap(), PAYLOAD);
    }

    #[tokio::test]
    async fn reuse_verification_can_be_disabled() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache = cache_with(&root, fetcher.clone()).with_verify_on_reuse(false);
        let resource = checkpoint_for(PAYLOAD);

        let path = cache.ensure(&resource).await.unwrap();
        fs::write(&path, b"tampered").unwrap();

        cache.ensure(&resource).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn digest_mismatch_discards_partial_artifact() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(b"not what was promised"));
        let cache = ResourceCache::new(root.path().to_path_buf(), fetcher.clone())
            .with_retry_policy(1, Duration::from_millis(1));
        let resource = checkpoint_for(PAYLOAD);

        let err = cache.ensure(&resource).await.unwrap_err();
        assert!(matches!(err, LipSyncError::Integrity { .. }));

        let artifact = cache.artifact_path(&resource);
        assert!(!artifact.exists());
        assert!(!staging_path(&artifact).exists());

        let entry = CacheEntry::load(&CacheEntry::sidecar_path(&artifact))
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, VerificationStatus::Failed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_ensure_downloads_once() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD).slow(Duration::from_millis(100)));
        let cache = Arc::new(cache_with(&root, fetcher.clone()));
        let resource = checkpoint_for(PAYLOAD);

        let (a, b) = tokio::join!(cache.ensure(&resource), cache.ensure(&resource));

        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a, b);
        assert_eq!(fetcher.calls(), 1, "loser must reuse the winner's result");
    }

    #[tokio::test]
    async fn repository_cloned_once() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache = cache_with(&root, fetcher.clone());
        let resource = Resource::repository("wav2lip", "repo", "https://example.com/w.git");

        let first = cache.ensure(&resource).await.unwrap();
        let second = cache.ensure(&resource).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, cache.repo_path("wav2lip"));
        assert_eq!(fetcher.calls(), 1);
        assert!(first.join("inference.py").exists());
    }

    #[tokio::test]
    async fn list_entries_reports_cached_checkpoints() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache = cache_with(&root, fetcher);
        let resource = checkpoint_for(PAYLOAD);

        assert!(cache.list_entries().unwrap().is_empty());

        cache.ensure(&resource).await.unwrap();

        let entries = cache.list_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "wav2lip.pth");
        assert!(cache.recheck_entry(&entries[0]).unwrap());
    }

    #[tokio::test]
    async fn clear_removes_engine_trees() {
        let root = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(PAYLOAD));
        let cache = cache_with(&root, fetcher.clone());
        let resource = checkpoint_for(PAYLOAD);

        cache.ensure(&resource).await.unwrap();
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.engines().unwrap().is_empty());

        // Cleared cache re-acquires on demand
        cache.ensure(&resource).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }
}
