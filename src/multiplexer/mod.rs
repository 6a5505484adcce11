//! File Multiplexer Module
//!
//! Packs many small named files into one block store.
//!
//! ## Responsibilities
//! - Map each logical file name to an offset range inside one segment
//! - Keep a file within one segment (a file never exceeds the block size)
//! - Extend the most recently created file in place while it is still in
//!   the appendix; rewrite anything else
//! - Persist the name → location index as the store's final segment
//!
//! ## Index Segment
//! ```text
//! | seg 0: a b c | seg 1: d e | seg 2: index |
//!
//! index rows:  a,0,0,5,0
//!              b,0,5,12,1
//!              ...
//!              d,1,0,40,0
//! ```
//! The index is rebuilt wholesale and appended as a fresh segment on every
//! flush that follows a change; earlier index segments are left in place.

mod container;
mod record;

pub use container::FileMultiplexer;
pub use record::FileRecord;

/// Counters describing how appends were served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiplexerStats {
    /// Appends that extended the live appendix without re-reading the file
    pub in_place_appends: u64,
    /// Appends served by read-modify-write
    pub rewrites: u64,
}
