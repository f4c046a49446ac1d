use std::{io, path::Path};

use tracing::trace;

use super::{Device, OpenFlags, Store};
use crate::sys;

/// The operating system's filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }
}

impl Store for FileStore {
    type Device = FileDevice;

    fn open(&self, path: &Path, flags: OpenFlags, mode: u32) -> io::Result<FileDevice> {
        trace!(?path, ?flags, mode, "file.open");
        let file = sys::File::open(path, flags, mode)?;
        Ok(FileDevice { file })
    }
}

/// An open file. The handle is closed when the device is dropped.
#[derive(Debug)]
pub struct FileDevice {
    file: sys::File,
}

impl Device for FileDevice {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.read_at(buf, offset)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.file.write_at(buf, offset)
    }

    fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn len(&self) -> io::Result<u64> {
        self.file.len()
    }
}
