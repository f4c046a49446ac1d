//! Backing stores.
//!
//! A [Store] opens files by path and hands back [Device]s; a device only has to
//! support positioned reads and writes, a durability sync and a size query. All
//! caching is done by the page cache above it.

use std::{io, path::Path};

use bitflags::bitflags;

pub use self::{
    debug::{DebugDevice, DebugStats, DebugStore},
    file::{FileDevice, FileStore},
    mem::{MemDevice, MemStore},
};

mod debug;
mod file;
mod mem;

bitflags! {
    /// How a file is opened by a [Store].
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        /// Create the file if it does not exist.
        const CREATE = 1 << 2;
        /// Discard existing contents on open.
        const TRUNCATE = 1 << 3;
        /// Together with `CREATE`, fail if the file already exists.
        const EXCLUSIVE = 1 << 4;
        /// Bypass the operating system's page cache where supported. Page buffers
        /// must then satisfy the device's alignment requirements.
        const DIRECT = 1 << 5;

        const READ_WRITE = Self::READ.bits | Self::WRITE.bits;
    }
}

/// A byte-addressable file in a backing store.
pub trait Device {
    /// Issue a single positioned read. Fewer than `buf.len()` bytes are returned only
    /// at end of file.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Issue a single positioned write, returning the number of bytes written. A
    /// short write must be reported as such, never padded.
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;

    fn sync(&self) -> io::Result<()>;

    fn len(&self) -> io::Result<u64>;
}

pub trait Store {
    type Device: Device;

    /// Open `path`. `mode` holds the permission bits used when the file is created.
    fn open(&self, path: &Path, flags: OpenFlags, mode: u32) -> io::Result<Self::Device>;
}

impl<S> Store for &S
where
    S: Store + ?Sized,
{
    type Device = S::Device;

    fn open(&self, path: &Path, flags: OpenFlags, mode: u32) -> io::Result<Self::Device> {
        (**self).open(path, flags, mode)
    }
}
