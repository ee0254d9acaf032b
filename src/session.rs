//! Opening and exporting containers from several threads.
//!
//! Three pieces of shared state exist:
//! - a process-wide export lock; exports take it exclusively, reads take it shared, so at most
//!   one export runs at a time and readers never wait on each other;
//! - a registry of archive paths currently being read, where a second reader of the same path
//!   fails immediately with [`IcddError::Locked`];
//! - a [`ContainerCache`] of open containers keyed by guid, with a sliding TTL. It is a plain
//!   value, handed to whoever needs it.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{mapref::entry::Entry, DashMap};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::{
    archive,
    config::IcddConfig,
    container::{index_file_name, InformationContainer},
    error::IcddError,
    graph::{GraphCodec, TurtleCodec},
    validation::validate_archive,
};

/// An open container shared between threads.
pub type SharedContainer = Arc<Mutex<InformationContainer>>;

static EXPORT_LOCK: RwLock<()> = parking_lot::const_rwlock(());

/// The process-wide export lock.
pub struct ExportLock;

impl ExportLock {
    /// Exclusive side, held for the duration of one export.
    pub fn write() -> RwLockWriteGuard<'static, ()> {
        if EXPORT_LOCK.is_locked() {
            tracing::info!("[ExportLock] Waiting for exclusive access");
        }
        EXPORT_LOCK.write()
    }

    /// Shared side, held while an archive is read.
    pub fn read() -> RwLockReadGuard<'static, ()> {
        if EXPORT_LOCK.is_locked_exclusive() {
            tracing::info!("[ExportLock] Waiting for an export to finish");
        }
        EXPORT_LOCK.read()
    }

    pub fn is_exporting() -> bool {
        EXPORT_LOCK.is_locked_exclusive()
    }
}

static READERS: Lazy<ReaderRegistry> = Lazy::new(ReaderRegistry::default);

/// Paths that currently have a reader.
#[derive(Debug, Default)]
pub struct ReaderRegistry(Mutex<HashSet<PathBuf>>);

impl ReaderRegistry {
    pub fn global() -> &'static ReaderRegistry {
        &READERS
    }

    fn key(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Registers `path`, or fails with `Locked` if another reader holds it.
    pub fn acquire(&self, path: &Path) -> Result<ReaderLease<'_>, IcddError> {
        let key = ReaderRegistry::key(path);
        if !self.0.lock().insert(key.clone()) {
            tracing::warn!("{:?} is already being read", key);
            return Err(IcddError::Locked(format!("{key:?} is already being read")));
        }
        Ok(ReaderLease {
            registry: self,
            path: key,
        })
    }

    pub fn is_reading(&self, path: &Path) -> bool {
        self.0.lock().contains(&ReaderRegistry::key(path))
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

/// Releases its path when dropped.
#[derive(Debug)]
pub struct ReaderLease<'a> {
    registry: &'a ReaderRegistry,
    path: PathBuf,
}

impl ReaderLease<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ReaderLease<'_> {
    fn drop(&mut self) {
        self.registry.0.lock().remove(&self.path);
    }
}

struct CacheEntry {
    container: SharedContainer,
    touched: Instant,
}

impl CacheEntry {
    fn new(container: SharedContainer) -> CacheEntry {
        CacheEntry {
            container,
            touched: Instant::now(),
        }
    }
}

/// Open containers by guid. Every hit restarts the entry's lifetime; an entry untouched for
/// longer than the TTL is dropped on its next lookup or by [`ContainerCache::evict_expired`].
pub struct ContainerCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl std::fmt::Debug for ContainerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ContainerCache {
    pub fn new(ttl: Duration) -> ContainerCache {
        ContainerCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn from_config(config: &IcddConfig) -> ContainerCache {
        ContainerCache::new(config.cache_ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, guid: &str) -> Option<SharedContainer> {
        let expired = match self.entries.get_mut(guid) {
            Some(mut entry) if entry.touched.elapsed() <= self.ttl => {
                entry.touched = Instant::now();
                return Some(entry.container.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(guid);
            tracing::debug!("cache entry {guid} expired");
        }
        None
    }

    /// Caches `container` under its guid, replacing any previous entry.
    pub fn insert(&self, container: InformationContainer) -> SharedContainer {
        let guid = container.guid().to_string();
        let shared = Arc::new(Mutex::new(container));
        self.entries.insert(guid, CacheEntry::new(shared.clone()));
        shared
    }

    /// A live entry, or the result of `open` cached under `guid`. `open` runs while the entry is
    /// locked, so concurrent callers for one guid open it once; it must not use this cache.
    pub fn get_or_try_insert_with<F>(&self, guid: &str, open: F) -> Result<SharedContainer, IcddError>
    where
        F: FnOnce() -> Result<InformationContainer, IcddError>,
    {
        match self.entries.entry(guid.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().touched.elapsed() <= self.ttl {
                    tracing::debug!("cache hit for {guid}");
                    let entry = occupied.get_mut();
                    entry.touched = Instant::now();
                    return Ok(entry.container.clone());
                }
                tracing::debug!("cache entry {guid} expired");
                match open() {
                    Ok(container) => {
                        let shared = Arc::new(Mutex::new(container));
                        occupied.insert(CacheEntry::new(shared.clone()));
                        Ok(shared)
                    }
                    Err(err) => {
                        occupied.remove();
                        Err(err)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let shared = Arc::new(Mutex::new(open()?));
                vacant.insert(CacheEntry::new(shared.clone()));
                Ok(shared)
            }
        }
    }

    pub fn remove(&self, guid: &str) -> Option<SharedContainer> {
        self.entries.remove(guid).map(|(_, entry)| entry.container)
    }

    /// Drops every expired entry. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.touched.elapsed() <= self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extracts archives into fresh workfolders and opens them, validating first when configured.
pub struct ContainerReader {
    config: IcddConfig,
    codec: Arc<dyn GraphCodec>,
}

impl ContainerReader {
    pub fn new(config: IcddConfig) -> ContainerReader {
        ContainerReader::with_codec(config, Arc::new(TurtleCodec))
    }

    pub fn with_codec(config: IcddConfig, codec: Arc<dyn GraphCodec>) -> ContainerReader {
        ContainerReader { config, codec }
    }

    /// Opens `archive`. An invalid container is refused with every failed criterion and its
    /// workfolder is removed again.
    pub fn read(&self, archive: &Path) -> Result<InformationContainer, IcddError> {
        let _shared = ExportLock::read();
        let dir = self.config.container_dir(&Uuid::new_v4().to_string());
        let workfolder = WorkfolderGuard::new(&dir);
        if self.config.validate_on_read {
            let report = validate_archive(archive, &dir, self.codec.clone())?;
            if !report.is_valid() {
                return Err(IcddError::InvalidContainer(report.failures()));
            }
        } else {
            archive::unpack(archive, &dir)?;
        }
        let name = archive
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let container = InformationContainer::open_dir(&dir, name, self.codec.clone())?;
        workfolder.keep();
        Ok(container)
    }
}

/// Removes a freshly extracted workfolder when dropped, unless [`WorkfolderGuard::keep`] was
/// called.
struct WorkfolderGuard {
    dir: PathBuf,
    keep: bool,
}

impl WorkfolderGuard {
    fn new(dir: &Path) -> WorkfolderGuard {
        WorkfolderGuard {
            dir: dir.to_path_buf(),
            keep: false,
        }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for WorkfolderGuard {
    fn drop(&mut self) {
        if self.keep || !self.dir.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!("removed workfolder {:?} of a failed read", self.dir),
            Err(err) => tracing::warn!("could not clean up {:?}: {err}", self.dir),
        }
    }
}

/// A [`ContainerReader`] that refuses a second concurrent read of the same archive path.
pub struct SynchronizedReader {
    reader: ContainerReader,
    registry: &'static ReaderRegistry,
}

impl SynchronizedReader {
    pub fn new(config: IcddConfig) -> SynchronizedReader {
        SynchronizedReader {
            reader: ContainerReader::new(config),
            registry: ReaderRegistry::global(),
        }
    }

    pub fn read(&self, archive: &Path) -> Result<InformationContainer, IcddError> {
        let _lease = self.registry.acquire(archive)?;
        self.reader.read(archive)
    }
}

/// Re-opens containers already unpacked in the workfolder, through the cache.
pub struct WorkfolderReader {
    config: IcddConfig,
    codec: Arc<dyn GraphCodec>,
    cache: Arc<ContainerCache>,
}

impl WorkfolderReader {
    pub fn new(config: IcddConfig, cache: Arc<ContainerCache>) -> WorkfolderReader {
        WorkfolderReader {
            config,
            codec: Arc::new(TurtleCodec),
            cache,
        }
    }

    /// The container unpacked under `guid`. `name` defaults to `<guid>.icdd`.
    pub fn open(&self, guid: &str, name: Option<&str>) -> Result<SharedContainer, IcddError> {
        self.cache.get_or_try_insert_with(guid, || {
            let dir = self.config.container_dir(guid);
            if !dir.is_dir() {
                return Err(IcddError::NotFound(format!("no workfolder for container {guid}")));
            }
            InformationContainer::open_dir(&dir, name.unwrap_or(guid), self.codec.clone())
        })
    }

    /// Guids of the unpacked containers in the workfolder, sorted.
    pub fn list(&self) -> Result<Vec<String>, IcddError> {
        let index_file = index_file_name(self.codec.as_ref());
        if !self.config.workfolder.is_dir() {
            return Ok(Vec::new());
        }
        let mut guids: Vec<String> = std::fs::read_dir(&self.config.workfolder)?
            .filter_map(Result::ok)
            .filter(|e| e.path().join(&index_file).is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        guids.sort();
        Ok(guids)
    }

    pub fn cache(&self) -> &Arc<ContainerCache> {
        &self.cache
    }
}

/// Packs containers under the exclusive export lock.
pub struct ContainerWriter {
    config: IcddConfig,
}

impl ContainerWriter {
    pub fn new(config: IcddConfig) -> ContainerWriter {
        ContainerWriter { config }
    }

    /// Validates (when configured) and exports to `target`. Returns the written archive path.
    pub fn write(
        &self,
        container: &mut InformationContainer,
        target: &Path,
    ) -> Result<PathBuf, IcddError> {
        let _exclusive = ExportLock::write();
        if self.config.validate_on_export {
            let report = container.validate();
            if !report.is_valid() {
                return Err(IcddError::InvalidContainer(report.failures()));
            }
        }
        container.export(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use test_log::test;

    fn config(root: &Path) -> IcddConfig {
        IcddConfig {
            workfolder: root.join("work"),
            ..Default::default()
        }
    }

    #[test]
    fn test_registry_refuses_second_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.icdd");
        let registry = ReaderRegistry::default();
        let lease = registry.acquire(&path).unwrap();
        assert!(registry.is_reading(&path));
        assert!(matches!(registry.acquire(&path), Err(IcddError::Locked(_))));
        drop(lease);
        assert!(registry.is_empty());
        assert!(registry.acquire(&path).is_ok());
    }

    #[test]
    fn test_cache_expires_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let container = InformationContainer::create("site", &cfg).unwrap();
        let guid = container.guid().to_string();

        let cache = ContainerCache::new(Duration::from_millis(50));
        cache.insert(container);
        assert!(cache.get(&guid).is_some());
        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get(&guid).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let mut container = InformationContainer::create("site", &cfg).unwrap();
        let archive = ContainerWriter::new(cfg.clone())
            .write(&mut container, &dir.path().join("site"))
            .unwrap();
        assert!(!ExportLock::is_exporting());

        let reopened = SynchronizedReader::new(cfg).read(&archive).unwrap();
        assert_eq!(reopened.name(), "site.icdd");
        assert_ne!(reopened.guid(), container.guid());
        assert_eq!(
            reopened.description().id(),
            container.description().id()
        );
    }

    #[test]
    fn test_reader_refuses_invalid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let bogus = dir.path().join("bogus.icdd");
        std::fs::write(&bogus, "plain").unwrap();
        match ContainerReader::new(cfg.clone()).read(&bogus) {
            Err(IcddError::InvalidContainer(failures)) => {
                assert!(failures.iter().any(|f| f.criterion == "Is valid ZIP file?"));
            }
            other => panic!("expected InvalidContainer, got {other:?}"),
        }
        let cache = Arc::new(ContainerCache::new(Duration::from_secs(1)));
        assert!(WorkfolderReader::new(cfg, cache).list().unwrap().is_empty());
    }

    fn workfolder_entries(cfg: &IcddConfig) -> usize {
        std::fs::read_dir(&cfg.workfolder).map_or(0, |entries| entries.count())
    }

    #[test]
    fn test_failed_read_leaves_no_workfolder() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = IcddConfig {
            validate_on_read: false,
            ..config(dir.path())
        };
        let reader = ContainerReader::new(cfg.clone());

        let bogus = dir.path().join("bogus.icdd");
        std::fs::write(&bogus, "plain").unwrap();
        assert!(reader.read(&bogus).is_err());
        assert_eq!(workfolder_entries(&cfg), 0);

        // a readable archive that holds no index
        let stray = dir.path().join("stray.icdd");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&stray).unwrap());
        zip.start_file("readme.txt", zip::write::FileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut zip, b"no index here").unwrap();
        zip.finish().unwrap();
        assert!(reader.read(&stray).is_err());
        assert_eq!(workfolder_entries(&cfg), 0);
    }

    #[test]
    fn test_concurrent_misses_open_once() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let cache = ContainerCache::new(Duration::from_secs(60));
        let opened = std::sync::atomic::AtomicUsize::new(0);
        let barrier = std::sync::Barrier::new(4);

        let handles: Vec<SharedContainer> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_try_insert_with("shared", || {
                                opened.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                                std::thread::sleep(Duration::from_millis(20));
                                InformationContainer::create("site", &cfg)
                            })
                            .unwrap()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(opened.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_reopened_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let cache = ContainerCache::new(Duration::from_millis(30));
        let first = cache
            .get_or_try_insert_with("site", || InformationContainer::create("site", &cfg))
            .unwrap();
        std::thread::sleep(Duration::from_millis(80));

        let failed = cache.get_or_try_insert_with("site", || {
            Err(IcddError::NotFound("gone".to_string()))
        });
        assert!(matches!(failed, Err(IcddError::NotFound(_))));
        assert!(cache.is_empty());

        let second = cache
            .get_or_try_insert_with("site", || InformationContainer::create("again", &cfg))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().name(), "again.icdd");
    }

    #[test]
    fn test_workfolder_reader_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let container = InformationContainer::create("site", &cfg).unwrap();
        let guid = container.guid().to_string();
        drop(container);

        let cache = Arc::new(ContainerCache::from_config(&cfg));
        let reader = WorkfolderReader::new(cfg, cache.clone());
        assert_eq!(reader.list().unwrap(), vec![guid.clone()]);
        let first = reader.open(&guid, Some("site")).unwrap();
        let second = reader.open(&guid, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(matches!(reader.open("missing", None), Err(IcddError::NotFound(_))));
    }
}
