//! # Checksummed Page Cache
//!
//! [`Pagemaster`] presents a flat file as a virtual array of fixed-size
//! pages. Every page is stored on disk as a 4-byte big-endian CRC-32 (IEEE
//! polynomial) followed by the payload, and the checksum is recomputed and
//! verified on every disk read — the cache never trusts a page it did not
//! just validate or write itself.
//!
//! ## Cache Behavior
//!
//! Up to `max_cache` payloads are held in memory. Lookups on the hot path
//! take only the read lock and bump an atomic access stamp; misses fall
//! through to the write lock, re-check (two racing readers may both reach
//! the disk, but only one insert wins), and load. When the cache is full the
//! least-recently-stamped page is evicted; a dirty victim is written back
//! first, and a failed write-back aborts the load rather than dropping data.
//!
//! ## Durability
//!
//! `set_page`/`set_chunk` only mark cache entries dirty. [`flush_page`] and
//! [`flush_all_pages`] write dirty payloads (with fresh checksums) back to
//! disk; [`clear_cache`] drops everything without flushing, so callers that
//! care must flush first. The file is opened per read and per write and
//! never held across calls.
//!
//! [`flush_page`]: Pagemaster::flush_page
//! [`flush_all_pages`]: Pagemaster::flush_all_pages
//! [`clear_cache`]: Pagemaster::clear_cache

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crc::{Crc, CRC_32_ISO_HDLC};
use eyre::{ensure, Result, WrapErr};
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::{os_page_size, CHECKSUM_SIZE};
use crate::error::Error;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Debug)]
struct CachedPage {
    data: Vec<u8>,
    dirty: bool,
    stamp: AtomicU64,
}

/// File-backed page cache with per-page CRC-32 integrity checks.
#[derive(Debug)]
pub struct Pagemaster {
    path: PathBuf,
    max_cache: usize,
    payload: usize,
    tick: AtomicU64,
    cache: RwLock<HashMap<usize, CachedPage>>,
}

impl Pagemaster {
    /// Creates a cached view over the file at `path`, allowing `max_cache`
    /// pages in memory. No disk side effect; call [`initialize`] first if
    /// the file is new and empty.
    ///
    /// [`initialize`]: Pagemaster::initialize
    pub fn new(path: impl Into<PathBuf>, max_cache: usize) -> Self {
        Self {
            path: path.into(),
            max_cache,
            payload: os_page_size() - CHECKSUM_SIZE,
            tick: AtomicU64::new(0),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The number of usable bytes per page.
    pub fn page_payload(&self) -> usize {
        self.payload
    }

    /// The maximum number of pages allowed in the cache.
    pub fn max_pages_in_cache(&self) -> usize {
        self.max_cache
    }

    /// The number of pages currently cached.
    pub fn pages_in_cache(&self) -> usize {
        self.cache.read().len()
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `pages` copies of `template` (zero-padded to the payload size,
    /// checksummed) to the backing file, creating it if needed.
    ///
    /// A failed write leaves earlier pages in place; retrying overwrites
    /// everything, so initialization is idempotent.
    pub fn initialize(&self, pages: usize, template: &[u8]) -> Result<()> {
        ensure!(
            template.len() <= self.payload,
            "page template of {} bytes exceeds payload size {}",
            template.len(),
            self.payload
        );

        let _guard = self.cache.write();
        let file = self.open_for_write()?;

        let mut padded = template.to_vec();
        padded.resize(self.payload, 0);
        for page in 0..pages {
            self.write_record(&file, page, &padded)?;
        }
        Ok(())
    }

    /// Reads the page from disk unconditionally, verifies its checksum, and
    /// inserts it into the cache (evicting another page if the cache is
    /// full). A dirty cached copy is written back before the re-read so its
    /// changes are what the disk hands back. Returns the payload.
    pub fn load_page(&self, page: usize) -> Result<Vec<u8>> {
        let mut cache = self.cache.write();
        if let Some(cached) = cache.get_mut(&page) {
            if cached.dirty {
                let file = self.open_for_write()?;
                self.write_record(&file, page, &cached.data)?;
                cached.dirty = false;
            }
        }
        let data = self.read_record(page)?;
        if !cache.contains_key(&page) && cache.len() >= self.max_cache {
            self.evict_one(&mut cache)?;
        }
        cache.insert(
            page,
            CachedPage {
                data: data.clone(),
                dirty: false,
                stamp: AtomicU64::new(self.next_tick()),
            },
        );
        Ok(data)
    }

    /// Returns the page payload, serving from the cache when possible and
    /// falling back to a checked disk read on a miss.
    pub fn get_page(&self, page: usize) -> Result<Vec<u8>> {
        {
            let cache = self.cache.read();
            if let Some(cached) = cache.get(&page) {
                cached.stamp.store(self.next_tick(), Ordering::Relaxed);
                return Ok(cached.data.clone());
            }
        }

        let mut cache = self.cache.write();
        self.ensure_cached(&mut cache, page)?;
        let cached = cache.get(&page).expect("page cached above");
        Ok(cached.data.clone())
    }

    /// Returns `size` bytes of the page starting at `offset`.
    pub fn get_chunk(&self, page: usize, offset: usize, size: usize) -> Result<Vec<u8>> {
        ensure!(
            offset + size <= self.payload,
            "chunk {}..{} out of page payload bounds {}",
            offset,
            offset + size,
            self.payload
        );

        {
            let cache = self.cache.read();
            if let Some(cached) = cache.get(&page) {
                cached.stamp.store(self.next_tick(), Ordering::Relaxed);
                return Ok(cached.data[offset..offset + size].to_vec());
            }
        }

        let mut cache = self.cache.write();
        self.ensure_cached(&mut cache, page)?;
        let cached = cache.get(&page).expect("page cached above");
        Ok(cached.data[offset..offset + size].to_vec())
    }

    /// Replaces the page's cached payload (zero-padded to the payload size)
    /// and marks it dirty. The page is pulled into the cache first so the
    /// capacity limit is respected.
    pub fn set_page(&self, page: usize, data: &[u8]) -> Result<()> {
        ensure!(
            data.len() <= self.payload,
            "page data of {} bytes exceeds payload size {}",
            data.len(),
            self.payload
        );

        let mut cache = self.cache.write();
        self.ensure_cached(&mut cache, page)?;
        let cached = cache.get_mut(&page).expect("page cached above");
        cached.data.clear();
        cached.data.extend_from_slice(data);
        cached.data.resize(self.payload, 0);
        cached.dirty = true;
        cached.stamp.store(self.next_tick(), Ordering::Relaxed);
        Ok(())
    }

    /// Copies `chunk` into the cached payload at `offset` and marks the page
    /// dirty.
    pub fn set_chunk(&self, page: usize, offset: usize, chunk: &[u8]) -> Result<()> {
        ensure!(
            offset + chunk.len() <= self.payload,
            "chunk {}..{} out of page payload bounds {}",
            offset,
            offset + chunk.len(),
            self.payload
        );

        let mut cache = self.cache.write();
        self.ensure_cached(&mut cache, page)?;
        let cached = cache.get_mut(&page).expect("page cached above");
        cached.data[offset..offset + chunk.len()].copy_from_slice(chunk);
        cached.dirty = true;
        cached.stamp.store(self.next_tick(), Ordering::Relaxed);
        Ok(())
    }

    /// Writes the cached page to disk, dirty or not, and marks it clean on
    /// success. A page absent from the cache is a no-op.
    pub fn flush_page(&self, page: usize) -> Result<()> {
        let mut cache = self.cache.write();
        if let Some(cached) = cache.get_mut(&page) {
            let file = self.open_for_write()?;
            self.write_record(&file, page, &cached.data)?;
            cached.dirty = false;
        }
        Ok(())
    }

    /// Writes every dirty cached page back to disk, marking each clean as it
    /// lands. Stops at the first failure; the failed page and any not yet
    /// visited stay dirty so the flush can be retried.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut cache = self.cache.write();
        let file = self.open_for_write()?;
        for (&page, cached) in cache.iter_mut() {
            if cached.dirty {
                self.write_record(&file, page, &cached.data)?;
                cached.dirty = false;
            }
        }
        Ok(())
    }

    /// Drops every cache entry without flushing. Unflushed writes are lost.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    /// Loads `page` into the cache if absent. Must run under the write lock.
    fn ensure_cached(&self, cache: &mut HashMap<usize, CachedPage>, page: usize) -> Result<()> {
        if cache.contains_key(&page) {
            return Ok(());
        }
        let data = self.read_record(page)?;
        if cache.len() >= self.max_cache {
            self.evict_one(cache)?;
        }
        cache.insert(
            page,
            CachedPage {
                data,
                dirty: false,
                stamp: AtomicU64::new(self.next_tick()),
            },
        );
        Ok(())
    }

    /// Removes the least-recently-stamped page, writing it back first if it
    /// is dirty. A failed write-back keeps the victim cached and dirty.
    fn evict_one(&self, cache: &mut HashMap<usize, CachedPage>) -> Result<()> {
        let victim = cache
            .iter()
            .min_by_key(|(_, cached)| cached.stamp.load(Ordering::Relaxed))
            .map(|(&page, _)| page);

        if let Some(page) = victim {
            let cached = cache.get(&page).expect("victim chosen from this map");
            if cached.dirty {
                let file = self.open_for_write()?;
                self.write_record(&file, page, &cached.data)?;
            }
            cache.remove(&page);
        }
        Ok(())
    }

    fn open_for_write(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .wrap_err_with(|| format!("failed to open {} for writing", self.path.display()))
    }

    /// Writes one `[checksum | payload]` record at the page's stride offset.
    fn write_record(&self, file: &File, page: usize, payload: &[u8]) -> Result<()> {
        let mut record = Vec::with_capacity(CHECKSUM_SIZE + self.payload);
        record.extend_from_slice(&CRC32.checksum(payload).to_be_bytes());
        record.extend_from_slice(payload);

        let offset = (page * (self.payload + CHECKSUM_SIZE)) as u64;
        file.write_all_at(&record, offset)
            .wrap_err_with(|| format!("failed to write page {} of {}", page, self.path.display()))
    }

    /// Reads one record from disk and verifies its checksum.
    fn read_record(&self, page: usize) -> Result<Vec<u8>> {
        let file = File::open(&self.path)
            .wrap_err_with(|| format!("failed to open {} for reading", self.path.display()))?;

        let mut record = vec![0u8; CHECKSUM_SIZE + self.payload];
        let offset = (page * (self.payload + CHECKSUM_SIZE)) as u64;
        file.read_exact_at(&mut record, offset)
            .wrap_err_with(|| format!("failed to read page {} of {}", page, self.path.display()))?;

        let stored = u32::from_be_bytes(
            record[..CHECKSUM_SIZE]
                .try_into()
                .expect("checksum prefix is 4 bytes"),
        );
        if stored != CRC32.checksum(&record[CHECKSUM_SIZE..]) {
            return Err(Error::CorruptedPage { page }.into());
        }
        record.drain(..CHECKSUM_SIZE);
        Ok(record)
    }
}
