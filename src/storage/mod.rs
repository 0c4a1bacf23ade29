//! # Storage Module
//!
//! The on-disk substrate for PixiDB tables: a checksummed, cached page file
//! ([`Pagemaster`]) and the schema-aware row store built on top of it
//! ([`Store`]).
//!
//! ## File Layout
//!
//! Each store owns one directory whose final path component is the store's
//! name:
//!
//! ```text
//! <store-dir>/
//! ├── <name>.meta.json   # schema: columns in order + row count
//! └── <name>.dat         # data pages
//! ```
//!
//! ## Page Format
//!
//! The data file is a stream of fixed-stride records:
//!
//! ```text
//! +------------+------------------------+
//! | CRC-32 (4) | payload (page size - 4)|
//! +------------+------------------------+
//! ```
//!
//! The payload size is the OS page size minus the 4-byte checksum prefix, so
//! each record occupies exactly one aligned OS page. The checksum is the
//! IEEE CRC-32 of the payload, stored big-endian, and is verified on every
//! read from disk. Rows are packed whole into payloads; a row never
//! straddles a page boundary and trailing payload bytes are padding.
//!
//! ## Caching and Durability
//!
//! The pager caches up to a fixed number of page payloads in memory and
//! tracks dirtiness per page. Writes land in the cache and become visible to
//! other threads immediately; they reach disk on an explicit flush
//! ([`Pagemaster::flush_all_pages`], surfaced as `checkpoint` by the higher
//! layers) or when a dirty page is evicted to make room. A crash between
//! writes and a checkpoint loses those writes.
//!
//! ## Thread Safety
//!
//! The pager guards its cache with a reader-writer lock: cache hits take the
//! read lock, misses and all mutations take the write lock. Single-row
//! writes are therefore atomic with respect to readers — a reader sees the
//! pre- or post-image of a row, never a torn one.

mod pager;
mod store;

pub use pager::Pagemaster;
pub use store::Store;

/// Bytes of CRC-32 prefix ahead of each page payload on disk.
pub const CHECKSUM_SIZE: usize = 4;

/// Cache capacity, in pages, used by stores for their data files.
pub const MAX_PAGES_IN_CACHE: usize = 64;

/// Extension of the flat data file inside a store directory.
pub const DATA_FILE_EXT: &str = ".dat";

/// Extension of the schema sidecar inside a store directory.
pub const META_FILE_EXT: &str = ".meta.json";

/// The operating system's memory page size, which fixes the on-disk record
/// stride. Falls back to 4096 if the system refuses to say.
pub fn os_page_size() -> usize {
    // SAFETY: sysconf only reads kernel configuration; no pointers involved.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_page_size_is_plausible() {
        let size = os_page_size();
        assert!(size >= 4096);
        assert!(size.is_power_of_two());
    }
}
