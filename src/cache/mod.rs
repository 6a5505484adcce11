//! Object Cache Module
//!
//! Bounded write-back LRU cache in front of the filesystem.
//!
//! ## Responsibilities
//! - Serve named blobs from memory, falling back to disk on a miss
//! - Hold newly created blobs as dirty until eviction or flush
//! - Write back the least recently used dirty blob when over capacity
//! - Skip disk deletes for blobs that never reached disk
//!
//! ## Layout
//! ```text
//!   oldest                                       newest
//!   ┌──────┐  newer  ┌──────┐  newer  ┌──────┐
//!   │ slot │ ──────► │ slot │ ──────► │ slot │
//!   │  3   │ ◄────── │  0   │ ◄────── │  5   │
//!   └──────┘  older  └──────┘  older  └──────┘
//!        ▲                ▲                ▲
//!        └──── name → slot index (HashMap) ┘
//! ```

mod lru;
mod object_cache;

pub use object_cache::ObjectCache;

/// Counters describing cache behaviour since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads served from memory
    pub hits: u64,
    /// Reads that went to disk (including ones that found nothing)
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    /// Dirty entries written while being evicted
    pub write_backs: u64,
    /// Total objects written to disk
    pub disk_writes: u64,
    /// Total objects removed from disk
    pub disk_deletes: u64,
}
