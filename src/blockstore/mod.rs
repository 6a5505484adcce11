//! Block Store Module
//!
//! A "virtual big file": one append-only logical byte stream persisted as
//! a sequence of bounded segment objects.
//!
//! ## Responsibilities
//! - Buffer appends in an in-memory appendix
//! - Chunk the appendix into segments on flush (line-aware for text)
//! - Resolve byte ranges across segment boundaries by binary search
//! - Persist the segment list as an index object
//!
//! ## Object Layout
//! ```text
//! {dir}/
//!   ├── Big.0000000.bin        segment 0   [0, size0)
//!   ├── Big.0000001.bin        segment 1   [size0, size0+size1)
//!   ├── ...
//!   └── Big.bin.index.csv      "Big.0000000.bin,<size0>\n..."
//!
//!   logical stream:  | seg 0 | seg 1 | ... | appendix (memory) |
//! ```
//! Segment ids increase monotonically and are only reset by `delete()`,
//! which removes every segment first.

mod chunker;
mod segment;
mod store;

pub use segment::{Segment, SegmentTable};
pub use store::BlockStore;

/// Segment size used when a store is opened with `block_size == 0`
pub const DEFAULT_BLOCK_SIZE: usize = crate::config::MB;

/// Suffix appended to a store's file name to form its index object
pub const INDEX_SUFFIX: &str = ".index.csv";
