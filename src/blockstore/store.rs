//! Block Store implementation
//!
//! Append-only logical stream over segment objects held by the cache.

use std::iter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::cache::ObjectCache;
use crate::codec::{Decoded, Payload, TextShape};
use crate::error::{BlobError, Result};

use super::chunker::plan_chunks;
use super::{SegmentTable, DEFAULT_BLOCK_SIZE, INDEX_SUFFIX};

/// Mutable store state, guarded by the store mutex
struct StoreState {
    /// Directory holding the segments and the index
    dir: PathBuf,
    /// File name without its extension
    stem: String,
    /// Extension including the leading dot
    extension: String,
    index_path: PathBuf,
    block_size: usize,
    segments: SegmentTable,
    /// Appended bytes not yet persisted as segments
    appendix: BytesMut,
    /// Chunk on line boundaries (set once text has been appended)
    line_aware: bool,
    next_segment_id: u64,
    /// Segment list changed since the index object was written
    index_dirty: bool,
}

/// Append-only byte stream persisted as bounded segments
///
/// ## Concurrency:
/// - One mutex guards the segment table and the appendix
/// - Cache calls are made while holding it; the cache has its own lock
///   and never calls back into the store
///
/// Dropping the store runs a best-effort [`BlockStore::flush`].
pub struct BlockStore {
    path: PathBuf,
    cache: Arc<ObjectCache>,
    state: Mutex<StoreState>,
}

impl BlockStore {
    /// Open or create the store named by `path`.
    ///
    /// The file name must carry an extension; segments are named
    /// `<stem>.<7-digit id><ext>` next to it. A `block_size` of zero
    /// selects [`DEFAULT_BLOCK_SIZE`].
    pub fn open(cache: Arc<ObjectCache>, path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| BlobError::InvalidName(path.display().to_string()))?;
        let (stem, extension) = file_name
            .rsplit_once('.')
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .ok_or_else(|| {
                BlobError::InvalidName(format!("'{}' must have an extension", file_name))
            })?;

        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let mut state = StoreState {
            index_path: dir.join(format!("{}{}", file_name, INDEX_SUFFIX)),
            dir,
            stem: stem.to_string(),
            extension: format!(".{}", extension),
            block_size: if block_size > 0 { block_size } else { DEFAULT_BLOCK_SIZE },
            segments: SegmentTable::new(),
            appendix: BytesMut::new(),
            line_aware: false,
            next_segment_id: 0,
            index_dirty: false,
        };
        state.load_index(&cache)?;

        tracing::info!(
            store = %path.display(),
            segments = state.segments.len(),
            size = state.segments.physical_size(),
            "opened block store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            cache,
            state: Mutex::new(state),
        })
    }

    /// Add data to the appendix.
    ///
    /// Nothing is persisted until [`write_appendix`](Self::write_appendix)
    /// or [`flush`](Self::flush). Text payloads switch chunking to line
    /// boundaries for the rest of the store's life.
    pub fn append(&self, payload: impl Into<Payload>) -> Result<()> {
        let payload: Payload = payload.into();
        let is_text = payload.is_text();
        let bytes = payload.encode()?;

        let mut state = self.state.lock();
        state.line_aware |= is_text;
        state.appendix.extend_from_slice(&bytes);
        Ok(())
    }

    /// Persisted segments, plus one if the appendix holds data
    pub fn num_segments(&self) -> usize {
        self.state.lock().num_segments()
    }

    /// Raw bytes of segment `index`.
    ///
    /// `index == segment_count()` addresses the appendix. Returns `None`
    /// when the index is out of range or the appendix is empty.
    pub fn read_segment(&self, index: usize) -> Result<Option<Bytes>> {
        self.state.lock().read_segment(&self.cache, index)
    }

    /// Decode segment `index` as text
    pub fn read_segment_as(&self, index: usize, shape: TextShape) -> Result<Option<Decoded>> {
        match self.read_segment(index)? {
            Some(bytes) => crate::codec::decode(&bytes, shape).map(Some),
            None => Ok(None),
        }
    }

    /// Read the logical byte range `[start, end)`.
    ///
    /// `None` bounds mean the start/end of the stream; negative bounds
    /// count back from the end. Returns `None` for an empty or
    /// out-of-bounds range.
    pub fn read_range(&self, start: Option<i64>, end: Option<i64>) -> Result<Option<Bytes>> {
        self.state.lock().read_range(&self.cache, start, end)
    }

    /// Read the whole stream, appendix included
    pub fn read_all(&self) -> Result<Option<Bytes>> {
        self.read_range(None, None)
    }

    /// Persist the appendix as segments; returns how many were written
    pub fn write_appendix(&self) -> Result<usize> {
        self.state.lock().write_appendix(&self.cache)
    }

    /// Persist the whole appendix as exactly one segment, ignoring the
    /// block size. Returns whether a segment was written.
    pub fn seal_appendix(&self) -> Result<bool> {
        self.state.lock().seal_appendix(&self.cache)
    }

    /// Chunk out the appendix and rewrite the index if the segment list
    /// changed. With `also_flush_cache`, this store's objects are written
    /// through to disk as well.
    pub fn flush(&self, also_flush_cache: bool) -> Result<()> {
        self.state.lock().flush(&self.cache, also_flush_cache)
    }

    /// Delete every segment and the index, leaving an empty store
    pub fn delete(&self) -> Result<()> {
        self.state.lock().delete(&self.cache)
    }

    /// Flush and write everything through to disk
    pub fn close(self) -> Result<()> {
        self.flush(true)
    }

    // =========================================================================
    // Batch Helpers
    // =========================================================================

    /// Open each named store and flush the ones holding data.
    ///
    /// Returns the number of stores flushed.
    pub fn flush_stores<I, P>(cache: &Arc<ObjectCache>, paths: I, also_flush_cache: bool) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut flushed = 0;
        for path in paths {
            let store = BlockStore::open(Arc::clone(cache), path, 0)?;
            if store.physical_size() == 0 {
                continue;
            }
            store.flush(also_flush_cache)?;
            flushed += 1;
        }
        Ok(flushed)
    }

    /// Open each named store and delete the ones holding data.
    ///
    /// Returns the number of stores deleted.
    pub fn delete_stores<I, P>(cache: &Arc<ObjectCache>, paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut deleted = 0;
        for path in paths {
            let store = BlockStore::open(Arc::clone(cache), path, 0)?;
            if store.physical_size() == 0 {
                continue;
            }
            store.delete()?;
            deleted += 1;
        }
        Ok(deleted)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path the store was opened with
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index_path(&self) -> PathBuf {
        self.state.lock().index_path.clone()
    }

    pub fn block_size(&self) -> usize {
        self.state.lock().block_size
    }

    /// Number of persisted segments (the appendix is not counted)
    pub fn segment_count(&self) -> usize {
        self.state.lock().segments.len()
    }

    /// Bytes held in persisted segments
    pub fn physical_size(&self) -> u64 {
        self.state.lock().segments.physical_size()
    }

    pub fn appendix_len(&self) -> usize {
        self.state.lock().appendix.len()
    }

    /// Persisted plus buffered bytes
    pub fn total_size(&self) -> u64 {
        self.state.lock().total_size()
    }

    pub fn segment_sizes(&self) -> Vec<u64> {
        self.state.lock().segments.iter().map(|s| s.size).collect()
    }

    pub fn segment_paths(&self) -> Vec<PathBuf> {
        self.state.lock().segments.objects().map(Path::to_path_buf).collect()
    }

    /// Id the next persisted segment will carry
    pub fn next_segment_id(&self) -> u64 {
        self.state.lock().next_segment_id
    }

    /// Shared cache backing this store
    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    // =========================================================================
    // Appendix Access (for the file multiplexer)
    // =========================================================================

    /// Copy of `appendix[start..end]`, clamped to the appendix length
    pub(crate) fn appendix_slice(&self, start: usize, end: usize) -> Bytes {
        let state = self.state.lock();
        let end = end.min(state.appendix.len());
        let start = start.min(end);
        Bytes::copy_from_slice(&state.appendix[start..end])
    }

    /// Drop appendix bytes past `len`
    pub(crate) fn truncate_appendix(&self, len: usize) {
        self.state.lock().appendix.truncate(len);
    }
}

impl Drop for BlockStore {
    fn drop(&mut self) {
        if let Err(e) = self.state.get_mut().flush(&self.cache, false) {
            tracing::warn!(store = %self.path.display(), error = %e, "failed to flush block store on drop");
        }
    }
}

impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockStore")
            .field("path", &self.path)
            .field("segments", &state.segments.len())
            .field("physical_size", &state.segments.physical_size())
            .field("appendix_len", &state.appendix.len())
            .finish()
    }
}

// =============================================================================
// Locked Operations
// =============================================================================

impl StoreState {
    /// Rebuild the segment table from the index object, if one exists
    fn load_index(&mut self, cache: &ObjectCache) -> Result<()> {
        let Some(decoded) = cache.read_as(&self.index_path, TextShape::Rows)? else {
            return Ok(());
        };
        let Decoded::Rows(rows) = decoded else {
            return Ok(());
        };

        for row in rows {
            let [name, size] = row.as_slice() else {
                return Err(BlobError::CorruptIndex(format!(
                    "{}: expected 'name,size', got {:?}",
                    self.index_path.display(),
                    row
                )));
            };
            let size: u64 = size.parse().map_err(|_| {
                BlobError::CorruptIndex(format!("bad segment size '{}'", size))
            })?;
            self.segments.push(self.dir.join(name), size);
        }

        if let Some(last) = self.segments.last() {
            self.next_segment_id = self.parse_segment_id(&last.object)? + 1;
        }
        Ok(())
    }

    fn num_segments(&self) -> usize {
        self.segments.len() + usize::from(!self.appendix.is_empty())
    }

    fn total_size(&self) -> u64 {
        self.segments.physical_size() + self.appendix.len() as u64
    }

    fn read_segment(&self, cache: &ObjectCache, index: usize) -> Result<Option<Bytes>> {
        if let Some(segment) = self.segments.get(index) {
            return cache
                .read(&segment.object)?
                .map(Some)
                .ok_or_else(|| BlobError::MissingSegment(segment.object.clone()));
        }
        if index == self.segments.len() && !self.appendix.is_empty() {
            return Ok(Some(Bytes::copy_from_slice(&self.appendix)));
        }
        Ok(None)
    }

    fn read_range(&self, cache: &ObjectCache, start: Option<i64>, end: Option<i64>) -> Result<Option<Bytes>> {
        let total = self.total_size() as i64;
        let start = match start {
            None => 0,
            Some(s) if s < 0 => s + total,
            Some(s) => s,
        };
        let end = match end {
            None => total,
            Some(e) if e < 0 => e + total,
            Some(e) => e,
        };
        if start >= end || start < 0 || end > total {
            return Ok(None);
        }
        let (start, end) = (start as u64, end as u64);

        let count = self.segments.len();
        let physical = self.segments.physical_size();
        let first = self.segments.locate(start);
        let last = self.segments.locate(end - 1);

        let mut parts: Vec<Bytes> = Vec::with_capacity(last - first + 1);
        let base = match self.segments.get(first) {
            Some(segment) => segment.first_offset,
            None => physical,
        };

        if first < count {
            let objects: Vec<&Path> = (first..=last.min(count - 1))
                .filter_map(|i| self.segments.get(i))
                .map(|segment| segment.object.as_path())
                .collect();
            for (object, data) in objects.iter().zip(cache.read_many(&objects)?) {
                parts.push(data.ok_or_else(|| BlobError::MissingSegment(object.to_path_buf()))?);
            }
        }
        if last == count {
            let needed = (end - physical) as usize;
            parts.push(Bytes::copy_from_slice(&self.appendix[..needed]));
        }

        let joined = if parts.len() == 1 {
            parts.swap_remove(0)
        } else {
            let mut buf = BytesMut::with_capacity(parts.iter().map(Bytes::len).sum());
            for part in &parts {
                buf.extend_from_slice(part);
            }
            buf.freeze()
        };

        Ok(Some(joined.slice((start - base) as usize..(end - base) as usize)))
    }

    fn write_appendix(&mut self, cache: &ObjectCache) -> Result<usize> {
        if self.appendix.is_empty() {
            return Ok(0);
        }
        let appendix = std::mem::take(&mut self.appendix).freeze();
        let chunks = plan_chunks(&appendix, self.block_size, self.line_aware);

        let mut offset = 0;
        for len in &chunks {
            let chunk = appendix.slice(offset..offset + len);
            if let Err(e) = self.persist_segment(cache, chunk) {
                // Keep what was not persisted
                self.appendix = BytesMut::from(&appendix[offset..]);
                return Err(e);
            }
            offset += len;
        }
        Ok(chunks.len())
    }

    fn seal_appendix(&mut self, cache: &ObjectCache) -> Result<bool> {
        if self.appendix.is_empty() {
            return Ok(false);
        }
        let appendix = std::mem::take(&mut self.appendix).freeze();
        if let Err(e) = self.persist_segment(cache, appendix.clone()) {
            self.appendix = BytesMut::from(&appendix[..]);
            return Err(e);
        }
        Ok(true)
    }

    fn persist_segment(&mut self, cache: &ObjectCache, data: Bytes) -> Result<()> {
        let object = self.segment_path(self.next_segment_id);
        let size = data.len() as u64;
        cache.create(object.clone(), data)?;

        tracing::debug!(segment = %object.display(), size, "persisted segment");
        self.segments.push(object, size);
        self.next_segment_id += 1;
        self.index_dirty = true;
        Ok(())
    }

    fn flush(&mut self, cache: &ObjectCache, also_flush_cache: bool) -> Result<()> {
        self.write_appendix(cache)?;

        if self.index_dirty {
            cache.delete(&self.index_path)?;
            if !self.segments.is_empty() {
                let rows: Vec<Vec<String>> = self
                    .segments
                    .iter()
                    .map(|segment| vec![object_file_name(&segment.object), segment.size.to_string()])
                    .collect();
                cache.create(self.index_path.clone(), Payload::Rows(rows))?;
            }
            tracing::debug!(
                index = %self.index_path.display(),
                segments = self.segments.len(),
                "rewrote segment index"
            );
            self.index_dirty = false;
        }

        if also_flush_cache {
            let objects = iter::once(self.index_path.as_path()).chain(self.segments.objects());
            cache.flush_only(objects)?;
        }
        Ok(())
    }

    fn delete(&mut self, cache: &ObjectCache) -> Result<()> {
        self.appendix.clear();
        let objects = iter::once(self.index_path.as_path()).chain(self.segments.objects());
        cache.delete_many(objects)?;

        self.segments.clear();
        self.next_segment_id = 0;
        self.line_aware = false;
        self.index_dirty = false;
        Ok(())
    }

    // =========================================================================
    // Naming
    // =========================================================================

    /// "Big" + 42 + ".bin" → "{dir}/Big.0000042.bin"
    fn segment_path(&self, id: u64) -> PathBuf {
        self.dir
            .join(format!("{}.{:07}{}", self.stem, id, self.extension))
    }

    /// "{dir}/Big.0000042.bin" → 42
    fn parse_segment_id(&self, object: &Path) -> Result<u64> {
        let name = object_file_name(object);
        name.strip_suffix(self.extension.as_str())
            .and_then(|rest| rest.rsplit_once('.'))
            .and_then(|(_, id)| id.parse().ok())
            .ok_or_else(|| BlobError::CorruptIndex(format!("unrecognized segment name '{}'", name)))
    }
}

fn object_file_name(object: &Path) -> String {
    object
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
