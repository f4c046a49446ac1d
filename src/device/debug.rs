use std::{
    io,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use tracing::trace;

use super::{Device, OpenFlags, Store};

/// A store wrapper that counts the I/O reaching the inner store and can be told to
/// fail it. Every device opened through the same `DebugStore` shares one
/// [DebugStats].
#[derive(Debug, Default)]
pub struct DebugStore<S> {
    inner: S,
    stats: Arc<DebugStats>,
}

impl<S> DebugStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Default::default(),
        }
    }

    pub fn stats(&self) -> Arc<DebugStats> {
        self.stats.clone()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> Store for DebugStore<S>
where
    S: Store,
{
    type Device = DebugDevice<S::Device>;

    fn open(&self, path: &Path, flags: OpenFlags, mode: u32) -> io::Result<Self::Device> {
        let inner = self.inner.open(path, flags, mode)?;
        Ok(DebugDevice {
            inner,
            stats: self.stats.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DebugStats {
    reads: AtomicU64,
    writes: AtomicU64,
    syncs: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    short_writes: AtomicBool,
    fail_syncs: AtomicBool,
}

impl DebugStats {
    /// Positioned reads that reached the inner device.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Positioned writes that reached the inner device.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn syncs(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.syncs.store(0, Ordering::Relaxed);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Make writes persist all but the last byte and report the short count.
    pub fn short_writes(&self, short: bool) {
        self.short_writes.store(short, Ordering::Relaxed);
    }

    pub fn fail_syncs(&self, fail: bool) {
        self.fail_syncs.store(fail, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct DebugDevice<D> {
    inner: D,
    stats: Arc<DebugStats>,
}

impl<D> Device for DebugDevice<D>
where
    D: Device,
{
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        trace!(len = buf.len(), offset, "device.read");
        if self.stats.fail_reads.load(Ordering::Relaxed) {
            return Err(injected());
        }
        self.stats.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.read_at(buf, offset)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        trace!(len = buf.len(), offset, "device.write");
        if self.stats.fail_writes.load(Ordering::Relaxed) {
            return Err(injected());
        }
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        if self.stats.short_writes.load(Ordering::Relaxed) && buf.len() > 1 {
            return self.inner.write_at(&buf[..buf.len() - 1], offset);
        }
        self.inner.write_at(buf, offset)
    }

    fn sync(&self) -> io::Result<()> {
        trace!("device.sync");
        if self.stats.fail_syncs.load(Ordering::Relaxed) {
            return Err(injected());
        }
        self.stats.syncs.fetch_add(1, Ordering::Relaxed);
        self.inner.sync()
    }

    fn len(&self) -> io::Result<u64> {
        self.inner.len()
    }
}

fn injected() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "injected failure")
}
