//! File Multiplexer implementation
//!
//! Many small logical files stored as offset ranges of one block store.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::blockstore::BlockStore;
use crate::cache::ObjectCache;
use crate::codec::{decode, Decoded, Payload, TextShape};
use crate::error::{BlobError, Result};

use super::record::validate_name;
use super::{FileRecord, MultiplexerStats};

/// Mutable multiplexer state, guarded by the multiplexer mutex
struct MuxState {
    /// Sorted so listings and the persisted index have a stable order
    files: BTreeMap<String, FileRecord>,
    /// Candidate for in-place appends
    last_created: Option<String>,
    /// `files` changed since the index segment was written
    index_dirty: bool,
    stats: MultiplexerStats,
}

/// Container packing many small named files into one [`BlockStore`]
///
/// ## Concurrency:
/// - One mutex guards the file table; the block store is owned and only
///   reached while holding it, so multi-step updates are atomic
///
/// Dropping the multiplexer runs a best-effort [`FileMultiplexer::flush`].
pub struct FileMultiplexer {
    store: BlockStore,
    state: Mutex<MuxState>,
}

impl FileMultiplexer {
    /// Open or create the container named by `path`.
    ///
    /// The file table is rebuilt from the store's last segment.
    pub fn open(cache: Arc<ObjectCache>, path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let store = BlockStore::open(cache, path, block_size)?;

        let mut files = BTreeMap::new();
        let partitions = store.num_segments();
        if partitions > 0 {
            if let Some(Decoded::Rows(rows)) = store.read_segment_as(partitions - 1, TextShape::Rows)? {
                for row in rows {
                    let (name, record) = FileRecord::from_row(&row)?;
                    files.insert(name, record);
                }
            }
        }

        tracing::info!(
            container = %store.path().display(),
            files = files.len(),
            "opened file multiplexer"
        );

        Ok(Self {
            store,
            state: Mutex::new(MuxState {
                files,
                last_created: None,
                index_dirty: false,
                stats: MultiplexerStats::default(),
            }),
        })
    }

    /// Raw bytes of `name`, or `None` if no such file exists
    pub fn read_file(&self, name: &str) -> Result<Option<Bytes>> {
        let state = self.state.lock();
        match state.files.get(name) {
            Some(record) => state.read_record(&self.store, name, record).map(Some),
            None => Ok(None),
        }
    }

    /// Contents of `name` decoded as text
    pub fn read_file_as(&self, name: &str, shape: TextShape) -> Result<Option<Decoded>> {
        match self.read_file(name)? {
            Some(bytes) => decode(&bytes, shape).map(Some),
            None => Ok(None),
        }
    }

    /// Contents of `name` in its stored form: lines for text files, raw
    /// bytes otherwise
    pub fn read_file_decoded(&self, name: &str) -> Result<Option<Decoded>> {
        let state = self.state.lock();
        let Some(record) = state.files.get(name) else {
            return Ok(None);
        };
        let bytes = state.read_record(&self.store, name, record)?;
        if record.is_text {
            decode(&bytes, TextShape::Lines).map(Some)
        } else {
            Ok(Some(Decoded::Raw(bytes)))
        }
    }

    /// Create `name` holding `payload`.
    ///
    /// Fails if the file exists (unless `delete_existing`) or if the
    /// encoded payload is larger than one block.
    pub fn create_new_file(&self, name: &str, payload: impl Into<Payload>, delete_existing: bool) -> Result<()> {
        self.state
            .lock()
            .create_new_file(&self.store, name, payload.into(), delete_existing)
    }

    /// Append to an existing file
    pub fn append_existing_file(&self, name: &str, payload: impl Into<Payload>) -> Result<()> {
        self.state
            .lock()
            .append_existing_file(&self.store, name, payload.into())
    }

    /// Append to `name`, creating it if needed
    pub fn append_data(&self, name: &str, payload: impl Into<Payload>) -> Result<()> {
        let payload: Payload = payload.into();
        let mut state = self.state.lock();
        if state.files.contains_key(name) {
            state.append_existing_file(&self.store, name, payload)
        } else {
            state.create_new_file(&self.store, name, payload, false)
        }
    }

    /// Remove files from the container.
    ///
    /// With `must_exist`, the call is all-or-nothing: if any name is absent
    /// nothing is removed and `false` is returned. Removing the last file
    /// deletes the whole backing store.
    pub fn delete_files<I, S>(&self, names: I, must_exist: bool) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        let mut state = self.state.lock();

        if must_exist && names.iter().any(|name| !state.files.contains_key(name.as_ref())) {
            return Ok(false);
        }
        for name in &names {
            let name = name.as_ref();
            if state.files.remove(name).is_some() {
                state.index_dirty = true;
                if state.last_created.as_deref() == Some(name) {
                    state.last_created = None;
                }
            }
        }
        if state.files.is_empty() {
            state.delete_all_files(&self.store)?;
        }
        Ok(true)
    }

    /// Remove every file and delete the backing store
    pub fn delete_all_files(&self) -> Result<()> {
        self.state.lock().delete_all_files(&self.store)
    }

    /// File names in sorted order
    pub fn get_file_names(&self) -> Vec<String> {
        self.state.lock().files.keys().cloned().collect()
    }

    /// Persist pending files and, if anything changed, a fresh index
    /// segment. With `also_flush_cache`, everything is written through to
    /// disk.
    pub fn flush(&self, also_flush_cache: bool) -> Result<()> {
        self.state.lock().flush(&self.store, also_flush_cache)
    }

    /// Flush and write everything through to disk
    pub fn close(self) -> Result<()> {
        self.flush(true)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().files.contains_key(name)
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Location of `name` inside the store
    pub fn file_record(&self, name: &str) -> Option<FileRecord> {
        self.state.lock().files.get(name).copied()
    }

    pub fn stats(&self) -> MultiplexerStats {
        self.state.lock().stats
    }

    pub fn block_size(&self) -> usize {
        self.store.block_size()
    }

    /// Persisted segments of the backing store (the appendix is not counted)
    pub fn segment_count(&self) -> usize {
        self.store.segment_count()
    }

    pub fn segment_sizes(&self) -> Vec<u64> {
        self.store.segment_sizes()
    }

    /// Bytes held in the backing store's appendix
    pub fn appendix_len(&self) -> usize {
        self.store.appendix_len()
    }
}

impl Drop for FileMultiplexer {
    fn drop(&mut self) {
        if let Err(e) = self.state.get_mut().flush(&self.store, false) {
            tracing::warn!(
                container = %self.store.path().display(),
                error = %e,
                "failed to flush file multiplexer on drop"
            );
        }
    }
}

impl std::fmt::Debug for FileMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMultiplexer")
            .field("store", &self.store)
            .field("files", &self.state.lock().files.len())
            .finish()
    }
}

// =============================================================================
// Locked Operations
// =============================================================================

impl MuxState {
    fn read_record(&self, store: &BlockStore, name: &str, record: &FileRecord) -> Result<Bytes> {
        let (start, end) = (record.start as usize, record.end as usize);

        if record.segment == store.segment_count() {
            return Ok(store.appendix_slice(start, end));
        }
        let segment = store.read_segment(record.segment)?.ok_or_else(|| {
            BlobError::CorruptIndex(format!("file '{}' points at missing segment {}", name, record.segment))
        })?;
        if end > segment.len() {
            return Err(BlobError::CorruptIndex(format!(
                "file '{}' extends past the end of segment {}",
                name, record.segment
            )));
        }
        Ok(segment.slice(start..end))
    }

    fn create_new_file(&mut self, store: &BlockStore, name: &str, payload: Payload, delete_existing: bool) -> Result<()> {
        validate_name(name)?;
        if self.files.contains_key(name) && !delete_existing {
            return Err(BlobError::FileExists(name.to_string()));
        }

        let is_text = payload.is_text();
        let bytes = payload.encode()?;
        self.place(store, name, bytes, is_text)?;
        self.last_created = Some(name.to_string());
        Ok(())
    }

    fn append_existing_file(&mut self, store: &BlockStore, name: &str, payload: Payload) -> Result<()> {
        let record = *self
            .files
            .get(name)
            .ok_or_else(|| BlobError::FileNotFound(name.to_string()))?;
        let bytes = payload.encode()?;
        let added = bytes.len() as u64;
        let block_size = store.block_size() as u64;
        let appendix_len = store.appendix_len() as u64;

        // Most recently created and still the tail of the live appendix
        let at_tail = self.last_created.as_deref() == Some(name)
            && record.segment == store.segment_count()
            && record.end == appendix_len;

        if at_tail && appendix_len + added <= block_size {
            store.append(Payload::Raw(bytes))?;
            if let Some(record) = self.files.get_mut(name) {
                record.end += added;
            }
            self.index_dirty = true;
            self.stats.in_place_appends += 1;
            return Ok(());
        }

        let combined_len = record.len() + added;
        if combined_len > block_size {
            return Err(BlobError::PayloadTooLarge {
                len: combined_len,
                block_size,
            });
        }

        let existing = if at_tail {
            let existing = store.appendix_slice(record.start as usize, record.end as usize);
            store.truncate_appendix(record.start as usize);
            existing
        } else {
            self.read_record(store, name, &record)?
        };
        let mut combined = BytesMut::with_capacity(combined_len as usize);
        combined.extend_from_slice(&existing);
        combined.extend_from_slice(&bytes);

        if let Err(e) = self.place(store, name, combined.freeze(), record.is_text) {
            if at_tail {
                if let Err(restore) = self.restore_tail(store, name, record, existing) {
                    tracing::warn!(file = name, error = %restore, "failed to restore file after rewrite error");
                }
            }
            return Err(e);
        }
        self.stats.rewrites += 1;
        Ok(())
    }

    /// Put back a file that was cut from the appendix tail for a rewrite
    /// that then failed
    fn restore_tail(&mut self, store: &BlockStore, name: &str, record: FileRecord, existing: Bytes) -> Result<()> {
        if store.segment_count() == record.segment && store.appendix_len() as u64 == record.start {
            store.append(Payload::Raw(existing))?;
            self.files.insert(name.to_string(), record);
            return Ok(());
        }
        self.place(store, name, existing, record.is_text)
    }

    /// Append encoded bytes to the store and record where they landed.
    ///
    /// When the appendix cannot take them, it is chunked out first so the
    /// file starts a fresh segment.
    fn place(&mut self, store: &BlockStore, name: &str, bytes: Bytes, is_text: bool) -> Result<()> {
        let len = bytes.len() as u64;
        let block_size = store.block_size() as u64;
        if len > block_size {
            return Err(BlobError::PayloadTooLarge { len, block_size });
        }

        let mut start = store.appendix_len() as u64;
        if start + len > block_size {
            store.write_appendix()?;
            start = 0;
        }
        let segment = store.segment_count();
        store.append(Payload::Raw(bytes))?;

        self.files.insert(
            name.to_string(),
            FileRecord {
                segment,
                start,
                end: start + len,
                is_text,
            },
        );
        self.index_dirty = true;
        Ok(())
    }

    fn delete_all_files(&mut self, store: &BlockStore) -> Result<()> {
        self.files.clear();
        self.last_created = None;
        store.delete()?;
        self.index_dirty = true;
        Ok(())
    }

    /// Rebuilding the whole index costs O(files) per flush; it keeps the
    /// on-disk form a single self-contained segment.
    fn flush(&mut self, store: &BlockStore, also_flush_cache: bool) -> Result<()> {
        if self.index_dirty {
            if self.files.is_empty() {
                store.delete()?;
            } else {
                // The index must only describe persisted segments
                store.write_appendix()?;
                let rows: Vec<Vec<String>> = self
                    .files
                    .iter()
                    .map(|(name, record)| record.to_row(name))
                    .collect();
                store.append(Payload::Rows(rows))?;
                store.seal_appendix()?;
                tracing::debug!(
                    container = %store.path().display(),
                    files = self.files.len(),
                    "wrote file index segment"
                );
            }
            self.index_dirty = false;
            self.last_created = None;
        }
        store.flush(also_flush_cache)
    }
}
