//! Write-back page cache
//!
//! ## Layout
//!
//! The cache owns a fixed arena of page-sized buffers ("slots"), an open addressing
//! index from `(descriptor, page)` to slot, and a table of open descriptors with
//! their logical cursor and size. Reads and writes are split into page-aligned
//! segments; each segment resolves a slot, copies bytes in or out of its buffer and
//! advances the cursor.
//!
//! ## Eviction
//!
//! When no slot is free a victim is picked by an [Evictor], uniformly at random by
//! default. A dirty victim is written back before its slot is reused. If that write
//! fails the unwritten bytes are discarded and the slot is freed anyway, unless the
//! cache was built with
//! [retain_dirty_on_failure](PageCacheBuilder::retain_dirty_on_failure).
//!
//! ## Durability
//!
//! Dirty pages reach the backing store when they are evicted, when their descriptor
//! is synced or closed, or when the cache is dropped. Pages are always written in
//! full, so the file on disk grows in whole pages.

use std::{
    io::{self, SeekFrom},
    path::Path,
};

use tracing::{debug, error, trace, warn};

use crate::{
    device::{Device, OpenFlags, Store},
    types::{Fd, PageKey},
    ErrorKind, Result,
};

use self::{
    eviction::{Evictor, RandomEviction},
    files::FileTable,
    handle::FileHandle,
    index::KeyIndex,
    slots::SlotArena,
};

pub mod eviction;
mod files;
pub mod handle;
mod index;
mod slots;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_CAPACITY: usize = 256;
pub const DEFAULT_MAX_FILES: usize = 1024;
pub const DEFAULT_SEED: u64 = 0xC0FFEE;

/// Counters describing how the cache has been used.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Segments served by a page that was already resident.
    pub hits: u64,
    pub misses: u64,
    /// Pages read from the backing store.
    pub loads: u64,
    /// Pages lying past the logical end of file, zero-filled without a read.
    pub zero_fills: u64,
    /// Pages about to be fully overwritten, zero-filled without a read.
    pub skipped_loads: u64,
    /// Pages forced out to make room for another. Pages released by
    /// [close](PageCache::close) are not counted.
    pub evictions: u64,
    /// Dirty pages written back to the backing store.
    pub flushes: u64,
}

/// How a missing page is brought into its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Load,
    /// The caller overwrites the whole page, so reading it first would be wasted.
    Overwrite,
}

pub struct PageCache<S, E = RandomEviction>
where
    S: Store,
{
    store: S,
    slots: SlotArena,
    index: KeyIndex,
    files: FileTable<S::Device>,
    evictor: E,
    page_size: usize,
    retain_dirty_on_failure: bool,
    stats: CacheStats,
}

impl<S> PageCache<S>
where
    S: Store,
{
    /// A cache with the default configuration.
    pub fn new(store: S) -> Result<Self> {
        PageCacheBuilder::new().build(store)
    }
}

impl<S, E> PageCache<S, E>
where
    S: Store,
{
    /// Open `path` through the backing store. The descriptor starts at offset zero
    /// and its logical size is the size of the file on open.
    pub fn open<P>(&mut self, path: P, flags: OpenFlags, mode: u32) -> Result<Fd>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let device = self.store.open(path, flags, mode)?;
        let size = device.len()?;
        let fd = self.files.insert(device, size)?;
        debug!(%fd, ?path, size, "page_cache.open");
        Ok(fd)
    }

    /// Write back and release every page of `fd`, then close it.
    ///
    /// All resources are released even if a write-back fails; the first failure is
    /// returned.
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.files.get(fd)?;

        let mut first_error = None;
        for slot in self.slots.bound_to(fd) {
            if let Err(err) = self.flush_slot(slot) {
                warn!(%fd, slot, error = %err, "page_cache.close: write-back failed, page discarded");
                first_error.get_or_insert(err);
            }
            self.unbind_slot(slot);
        }

        let file = self.files.remove(fd)?;
        drop(file);
        debug!(%fd, "page_cache.close");

        first_error.map_or(Ok(()), Err)
    }

    /// Move the cursor of `fd`. Only absolute positions are supported; the cursor
    /// may be placed past the end of the file.
    pub fn seek(&mut self, fd: Fd, pos: SeekFrom) -> Result<u64> {
        let file = self.files.get_mut(fd)?;
        let offset = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(_) | SeekFrom::End(_) => {
                return Err(ErrorKind::InvalidArgument("only absolute seeks are supported").into())
            }
        };
        if i64::try_from(offset).is_err() {
            return Err(ErrorKind::InvalidArgument("seek offset out of range").into());
        }

        file.cursor = offset;
        Ok(offset)
    }

    /// Write back every dirty page of `fd` and then sync the backing file.
    ///
    /// Pages stay resident. The first failed write-back aborts the sync.
    pub fn sync(&mut self, fd: Fd) -> Result<()> {
        self.files.get(fd)?;
        for slot in self.slots.bound_to(fd) {
            self.flush_slot(slot)?;
        }
        self.files.get(fd)?.device.sync()?;
        debug!(%fd, "page_cache.sync");
        Ok(())
    }

    pub fn position(&self, fd: Fd) -> Result<u64> {
        Ok(self.files.get(fd)?.cursor)
    }

    /// The logical size of `fd`, including bytes not yet written back.
    pub fn size(&self, fd: Fd) -> Result<u64> {
        Ok(self.files.get(fd)?.size)
    }

    /// The number of slots currently holding a page.
    pub fn resident(&self) -> usize {
        self.slots.resident()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write a dirty slot back to its file. Clean and free slots are left alone.
    fn flush_slot(&mut self, slot: usize) -> Result<()> {
        let state = self.slots.get(slot);
        let key = match state.binding() {
            Some(key) if state.is_dirty() => key,
            _ => return Ok(()),
        };

        let file = self.files.get(key.fd)?;
        let data = self.slots.data(slot);
        let offset = key.page * self.page_size as u64;

        let written = file.device.write_at(data, offset)?;
        if written != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short page write: {} of {} bytes", written, data.len()),
            )
            .into());
        }

        self.slots.mark_clean(slot);
        self.stats.flushes += 1;
        trace!(fd = %key.fd, page = key.page, slot, "page.flush");
        Ok(())
    }

    fn unbind_slot(&mut self, slot: usize) {
        if let Some(key) = self.slots.unbind(slot) {
            self.index.erase(key);
        }
    }
}

impl<S, E> PageCache<S, E>
where
    S: Store,
    E: Evictor,
{
    /// Read from the cursor of `fd` into `buf`, stopping at the logical end of
    /// file. Returns the number of bytes read.
    ///
    /// If a page cannot be brought in after some bytes were already copied, the
    /// partial count is returned and the error dropped.
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        self.files.get(fd)?;

        let page_size = self.page_size;
        let mut done = 0;
        while done < buf.len() {
            let file = self.files.get(fd)?;
            let (cursor, size) = (file.cursor, file.size);
            if cursor >= size {
                break;
            }

            let page = cursor / page_size as u64;
            let offset = (cursor % page_size as u64) as usize;
            let len = (buf.len() - done)
                .min(page_size - offset)
                .min(usize::try_from(size - cursor).unwrap_or(usize::MAX));

            let slot = match self.acquire(PageKey::new(fd, page), Fill::Load, size) {
                Ok(slot) => slot,
                Err(err) if done > 0 => {
                    debug!(%fd, done, error = %err, "page_cache.read: returning partial read");
                    break;
                }
                Err(err) => return Err(err),
            };

            buf[done..done + len].copy_from_slice(&self.slots.data(slot)[offset..offset + len]);
            done += len;
            self.files.get_mut(fd)?.cursor += len as u64;
        }

        Ok(done)
    }

    /// Write `buf` at the cursor of `fd`, growing the logical size if the write
    /// ends past it. Returns the number of bytes written.
    ///
    /// A full cache never fails a write; it fails only if writing back an evicted
    /// page, or loading a partially overwritten one, fails. As with
    /// [read](Self::read), partial progress is returned instead of the error.
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        self.files.get(fd)?;

        let page_size = self.page_size;
        let mut done = 0;
        while done < buf.len() {
            let file = self.files.get(fd)?;
            let (cursor, size) = (file.cursor, file.size);

            let page = cursor / page_size as u64;
            let offset = (cursor % page_size as u64) as usize;
            let len = (buf.len() - done).min(page_size - offset);
            let fill = if offset == 0 && len == page_size {
                Fill::Overwrite
            } else {
                Fill::Load
            };

            let slot = match self.acquire(PageKey::new(fd, page), fill, size) {
                Ok(slot) => slot,
                Err(err) if done > 0 => {
                    debug!(%fd, done, error = %err, "page_cache.write: returning partial write");
                    break;
                }
                Err(err) => return Err(err),
            };

            self.slots.data_mut(slot)[offset..offset + len].copy_from_slice(&buf[done..done + len]);
            done += len;

            let file = self.files.get_mut(fd)?;
            file.cursor += len as u64;
            file.size = file.size.max(file.cursor);
        }

        Ok(done)
    }

    /// A [std::io] view of `fd`.
    pub fn file(&mut self, fd: Fd) -> Result<FileHandle<'_, S, E>> {
        self.files.get(fd)?;
        Ok(FileHandle::new(self, fd))
    }

    /// Find the slot holding `key`, bringing the page in if it is not resident.
    /// `size` is the logical size of the page's file.
    fn acquire(&mut self, key: PageKey, fill: Fill, size: u64) -> Result<usize> {
        if let Some(slot) = self.index.lookup(key) {
            self.stats.hits += 1;
            return Ok(slot);
        }
        self.stats.misses += 1;

        let slot = match self.slots.find_free() {
            Some(slot) => slot,
            None => {
                let victim = self.evictor.victim(self.slots.len());
                debug_assert!(victim < self.slots.len(), "victim out of range");
                self.evict(victim)?;
                victim
            }
        };

        match fill {
            Fill::Overwrite => {
                self.slots.buffer_mut(slot)?.fill(0);
                self.stats.skipped_loads += 1;
                trace!(fd = %key.fd, page = key.page, slot, "page.overwrite");
            }
            Fill::Load => self.load(slot, key, size)?,
        }

        self.slots.bind(slot, key);
        self.index.insert(key, slot);
        Ok(slot)
    }

    /// Fill the buffer of a free slot with the contents of `key`.
    fn load(&mut self, slot: usize, key: PageKey, size: u64) -> Result<()> {
        let offset = key.page * self.page_size as u64;
        let file = self.files.get(key.fd)?;
        let buf = self.slots.buffer_mut(slot)?;

        if offset >= size {
            buf.fill(0);
            self.stats.zero_fills += 1;
            trace!(fd = %key.fd, page = key.page, slot, "page.zero_fill");
            return Ok(());
        }

        let n = file.device.read_at(buf, offset)?;
        buf[n..].fill(0);
        self.stats.loads += 1;
        trace!(fd = %key.fd, page = key.page, slot, bytes = n, "page.load");
        Ok(())
    }

    /// Write back and release a slot.
    fn evict(&mut self, slot: usize) -> Result<()> {
        let result = self.flush_slot(slot);
        if let Err(err) = &result {
            if self.retain_dirty_on_failure {
                warn!(slot, error = %err, "page.evict: write-back failed, keeping page");
                return result;
            }
            warn!(slot, error = %err, "page.evict: write-back failed, page discarded");
        }

        if let Some(key) = self.slots.get(slot).binding() {
            trace!(fd = %key.fd, page = key.page, slot, "page.evict");
        }
        self.unbind_slot(slot);
        self.stats.evictions += 1;
        result
    }
}

impl<S, E> Drop for PageCache<S, E>
where
    S: Store,
{
    fn drop(&mut self) {
        for fd in self.files.open_fds() {
            if let Err(error) = self.close(fd) {
                error!(%fd, %error, "page_cache: close failed during drop");
            }
        }
    }
}

/// Configuration for a [PageCache]. Every setting is fixed once the cache is built.
#[derive(Debug, Clone)]
pub struct PageCacheBuilder {
    capacity: usize,
    page_size: usize,
    buffer_align: Option<usize>,
    max_files: usize,
    seed: u64,
    retain_dirty_on_failure: bool,
}

impl Default for PageCacheBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            page_size: DEFAULT_PAGE_SIZE,
            buffer_align: None,
            max_files: DEFAULT_MAX_FILES,
            seed: DEFAULT_SEED,
            retain_dirty_on_failure: false,
        }
    }
}

impl PageCacheBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of pages the cache may hold at once.
    pub fn capacity(mut self, pages: usize) -> Self {
        self.capacity = pages;
        self
    }

    pub fn page_size(mut self, bytes: usize) -> Self {
        self.page_size = bytes;
        self
    }

    /// Alignment of every page buffer. Must be a power of two dividing the page
    /// size. Defaults to the largest power of two dividing the page size, capped at
    /// 4096, which suits [OpenFlags::DIRECT] on common devices.
    pub fn buffer_align(mut self, align: usize) -> Self {
        self.buffer_align = Some(align);
        self
    }

    /// The size of the descriptor table.
    pub fn max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Seed for the default random eviction.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keep a dirty victim bound when writing it back fails, failing the operation
    /// that needed the slot instead of discarding the unwritten bytes.
    pub fn retain_dirty_on_failure(mut self, retain: bool) -> Self {
        self.retain_dirty_on_failure = retain;
        self
    }

    pub fn build<S>(self, store: S) -> Result<PageCache<S>>
    where
        S: Store,
    {
        let evictor = RandomEviction::seeded(self.seed);
        self.build_with_evictor(store, evictor)
    }

    pub fn build_with_evictor<S, E>(self, store: S, evictor: E) -> Result<PageCache<S, E>>
    where
        S: Store,
        E: Evictor,
    {
        if self.page_size == 0 {
            return Err(ErrorKind::InvalidArgument("page size must be non-zero").into());
        }
        if self.capacity == 0 {
            return Err(ErrorKind::InvalidArgument("capacity must be non-zero").into());
        }
        if self.max_files == 0 || u32::try_from(self.max_files).is_err() {
            return Err(ErrorKind::InvalidArgument("descriptor limit out of range").into());
        }

        let align = self
            .buffer_align
            .unwrap_or(1 << self.page_size.trailing_zeros().min(12));
        if !align.is_power_of_two() || self.page_size % align != 0 {
            return Err(ErrorKind::InvalidArgument(
                "buffer alignment must be a power of two dividing the page size",
            )
            .into());
        }

        Ok(PageCache {
            store,
            slots: SlotArena::new(self.capacity, self.page_size, align),
            index: KeyIndex::for_slots(self.capacity),
            files: FileTable::new(self.max_files),
            evictor,
            page_size: self.page_size,
            retain_dirty_on_failure: self.retain_dirty_on_failure,
            stats: CacheStats::default(),
        })
    }
}
