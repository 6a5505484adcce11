//! Object Cache implementation
//!
//! Write-back LRU cache keyed by object path.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::codec::{decode, Decoded, Payload, TextShape};
use crate::error::{BlobError, Result};

use super::lru::LruList;
use super::CacheStats;

/// A cached object
struct CacheEntry {
    payload: Bytes,
    /// Not yet written to disk
    dirty: bool,
}

/// Mutable cache state, guarded by the cache mutex
struct CacheState {
    capacity: usize,
    entries: LruList<PathBuf, CacheEntry>,
    stats: CacheStats,
}

/// Thread-safe, bounded, write-back LRU cache of named blobs
///
/// ## Concurrency:
/// - One mutex guards the recency list, the entry table and the counters
/// - Every public method holds it for its full duration, disk I/O included
///
/// ## Capacity:
/// - `capacity == 0` disables caching: every call goes straight to disk
/// - Otherwise at most `capacity` entries remain after any call returns
///
/// Dropping the cache flushes dirty entries on a best-effort basis; call
/// [`ObjectCache::flush`] to observe write errors.
pub struct ObjectCache {
    state: Mutex<CacheState>,
}

impl ObjectCache {
    /// Create a cache holding at most `capacity` objects
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                capacity,
                entries: LruList::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Create an object holding `payload`.
    ///
    /// The object stays in memory as dirty until it is evicted or flushed.
    /// Fails with [`BlobError::DuplicateObject`] if the name is already cached.
    pub fn create(&self, name: impl Into<PathBuf>, payload: impl Into<Payload>) -> Result<()> {
        let name = name.into();
        let payload: Payload = payload.into();
        let payload = payload.encode()?;

        let mut state = self.state.lock();
        if state.capacity == 0 {
            write_object(&name, &payload)?;
            state.stats.disk_writes += 1;
            return Ok(());
        }
        state.admit(name, CacheEntry { payload, dirty: true })
    }

    /// Read an object, or `None` if it exists neither in memory nor on disk
    pub fn read(&self, name: impl AsRef<Path>) -> Result<Option<Bytes>> {
        self.state.lock().read_one(name.as_ref())
    }

    /// Read several objects under one lock acquisition.
    ///
    /// Missing objects yield `None` in their slot; one missing name never
    /// fails the batch.
    pub fn read_many<I, P>(&self, names: I) -> Result<Vec<Option<Bytes>>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut state = self.state.lock();
        names
            .into_iter()
            .map(|name| state.read_one(name.as_ref()))
            .collect()
    }

    /// Read an object and decode it as text
    pub fn read_as(&self, name: impl AsRef<Path>, shape: TextShape) -> Result<Option<Decoded>> {
        match self.read(name)? {
            Some(bytes) => decode(&bytes, shape).map(Some),
            None => Ok(None),
        }
    }

    /// Delete an object from memory and disk.
    ///
    /// An entry that was still dirty never reached disk, so no disk delete
    /// is issued for it. Returns whether a file was removed from disk.
    pub fn delete(&self, name: impl AsRef<Path>) -> Result<bool> {
        self.state.lock().delete_one(name.as_ref())
    }

    /// Delete several objects; returns the number of files removed from disk
    pub fn delete_many<I, P>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut state = self.state.lock();
        let mut removed = 0;
        for name in names {
            if state.delete_one(name.as_ref())? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Write every dirty entry to disk; returns the number written
    pub fn flush(&self) -> Result<usize> {
        self.state.lock().flush_matching(|_| true)
    }

    /// Write the dirty entries among `names` to disk
    pub fn flush_only<I, P>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let wanted: HashSet<PathBuf> = names
            .into_iter()
            .map(|name| name.as_ref().to_path_buf())
            .collect();
        self.state.lock().flush_matching(|name| wanted.contains(name))
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Maximum number of cached objects (0 = caching disabled)
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Number of objects currently held in memory
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `name` is held in memory
    pub fn contains(&self, name: impl AsRef<Path>) -> bool {
        self.state.lock().entries.contains(&name.as_ref().to_path_buf())
    }

    /// Whether `name` is held in memory and not yet written to disk
    pub fn is_dirty(&self, name: impl AsRef<Path>) -> bool {
        self.state
            .lock()
            .entries
            .peek(&name.as_ref().to_path_buf())
            .is_some_and(|entry| entry.dirty)
    }

    /// Cached names from least to most recently used
    pub fn lru_order(&self) -> Vec<PathBuf> {
        self.state.lock().entries.keys_oldest_first()
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}

impl Drop for ObjectCache {
    fn drop(&mut self) {
        if let Err(e) = self.state.get_mut().flush_matching(|_| true) {
            tracing::warn!(error = %e, "failed to flush object cache on drop");
        }
    }
}

impl std::fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "ObjectCache<len: {}, cap: {}>",
            state.entries.len(),
            state.capacity
        )
    }
}

// =============================================================================
// Locked Operations
// =============================================================================

impl CacheState {
    /// Make room, then insert as most recently used.
    ///
    /// A failed write-back leaves the new entry out, so the cache never
    /// grows past its capacity.
    fn admit(&mut self, name: PathBuf, entry: CacheEntry) -> Result<()> {
        if self.entries.contains(&name) {
            return Err(BlobError::DuplicateObject(name));
        }
        while self.entries.len() >= self.capacity.max(1) {
            self.evict_oldest()?;
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Drop the least recently used entry, writing it back first if dirty
    fn evict_oldest(&mut self) -> Result<()> {
        let Some((name, entry)) = self.entries.oldest() else {
            return Ok(());
        };
        if entry.dirty {
            write_object(name, &entry.payload)?;
            tracing::debug!(
                object = %name.display(),
                size = entry.payload.len(),
                "wrote back evicted object"
            );
            self.stats.write_backs += 1;
            self.stats.disk_writes += 1;
        }
        self.entries.pop_oldest();
        self.stats.evictions += 1;
        Ok(())
    }

    fn read_one(&mut self, name: &Path) -> Result<Option<Bytes>> {
        let key = name.to_path_buf();
        if let Some(entry) = self.entries.get(&key) {
            let payload = entry.payload.clone();
            self.stats.hits += 1;
            return Ok(Some(payload));
        }

        self.stats.misses += 1;
        let Some(payload) = read_object(name)? else {
            return Ok(None);
        };
        if self.capacity > 0 {
            self.admit(
                key,
                CacheEntry {
                    payload: payload.clone(),
                    dirty: false,
                },
            )?;
        }
        Ok(Some(payload))
    }

    fn delete_one(&mut self, name: &Path) -> Result<bool> {
        let delete_from_disk = match self.entries.remove(&name.to_path_buf()) {
            Some(entry) => !entry.dirty,
            None => true,
        };
        if !delete_from_disk {
            return Ok(false);
        }
        let removed = remove_object(name)?;
        if removed {
            self.stats.disk_deletes += 1;
        }
        Ok(removed)
    }

    fn flush_matching(&mut self, wanted: impl Fn(&Path) -> bool) -> Result<usize> {
        let mut written = 0;
        for (name, entry) in self.entries.iter_mut() {
            if !entry.dirty || !wanted(name) {
                continue;
            }
            write_object(name, &entry.payload)?;
            entry.dirty = false;
            written += 1;
        }
        self.stats.disk_writes += written as u64;
        Ok(written)
    }
}

// =============================================================================
// Disk Access
// =============================================================================

fn read_object(path: &Path) -> Result<Option<Bytes>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(Bytes::from(data))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_object(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(data)?;
    Ok(())
}

fn remove_object(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
