//! Segment table
//!
//! Ordered descriptors of persisted segments with their cumulative
//! offsets. Offsets are stored rather than recomputed so a byte offset
//! resolves to its segment with one binary search over `last_offset`.

use std::path::{Path, PathBuf};

/// One persisted, immutable chunk of a block store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Object path known to the cache
    pub object: PathBuf,
    /// Size in bytes (always > 0)
    pub size: u64,
    /// Logical offset of the first byte
    pub first_offset: u64,
    /// Logical offset of the last byte
    pub last_offset: u64,
}

/// Segments in logical order, tiling `[0, physical_size)` without gaps
#[derive(Debug, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
    physical_size: u64,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment after the current end.
    ///
    /// Empty segments cannot be addressed by any offset, so they are
    /// ignored.
    pub fn push(&mut self, object: PathBuf, size: u64) {
        if size == 0 {
            return;
        }
        let first_offset = self.physical_size;
        self.physical_size += size;
        self.segments.push(Segment {
            object,
            size,
            first_offset,
            last_offset: self.physical_size - 1,
        });
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Object paths in segment order
    pub fn objects(&self) -> impl Iterator<Item = &Path> {
        self.segments.iter().map(|segment| segment.object.as_path())
    }

    /// Sum of all segment sizes
    pub fn physical_size(&self) -> u64 {
        self.physical_size
    }

    /// Index of the segment holding `offset`.
    ///
    /// Returns `len()` when the offset lies past the last segment, which
    /// callers read as "in the appendix".
    pub fn locate(&self, offset: u64) -> usize {
        self.segments
            .partition_point(|segment| segment.last_offset < offset)
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.physical_size = 0;
    }
}
