use std::{fs::OpenOptions, io, path::Path};

use crate::device::OpenFlags;

#[cfg(unix)]
use self::unix as imp;
#[cfg(windows)]
use self::windows as imp;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

/// A platform file supporting positioned I/O.
#[derive(Debug)]
pub struct File(imp::File);

impl File {
    pub fn open(path: &Path, flags: OpenFlags, mode: u32) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options
            .read(flags.contains(OpenFlags::READ))
            .write(flags.contains(OpenFlags::WRITE))
            .truncate(flags.contains(OpenFlags::TRUNCATE));

        if flags.contains(OpenFlags::CREATE) {
            if flags.contains(OpenFlags::EXCLUSIVE) {
                options.create_new(true);
            } else {
                options.create(true);
            }
        }

        imp::File::open_with(path, options, flags.contains(OpenFlags::DIRECT), mode).map(Self)
    }

    /// A single positioned read, retried only if interrupted by a signal.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        loop {
            match self.0.read_at(buf, offset) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                res => return res,
            }
        }
    }

    /// A single positioned write, retried only if interrupted by a signal.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        loop {
            match self.0.write_at(buf, offset) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                res => return res,
            }
        }
    }

    pub fn sync_all(&self) -> io::Result<()> {
        self.0.sync_all()
    }

    pub fn len(&self) -> io::Result<u64> {
        self.0.len()
    }
}
