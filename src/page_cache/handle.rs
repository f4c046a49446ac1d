use std::io::{self, Read, Seek, SeekFrom, Write};

use super::{eviction::Evictor, PageCache};
use crate::{device::Store, types::Fd};

/// Borrows a [PageCache] to expose one descriptor through [Read], [Write] and
/// [Seek].
///
/// [Write::flush] syncs the descriptor. Relative and end-based seeks are resolved
/// against the descriptor's cursor and logical size before being handed to the
/// cache as an absolute position. Dropping the handle does not close the
/// descriptor.
pub struct FileHandle<'a, S, E>
where
    S: Store,
{
    cache: &'a mut PageCache<S, E>,
    fd: Fd,
}

impl<'a, S, E> FileHandle<'a, S, E>
where
    S: Store,
{
    pub(super) fn new(cache: &'a mut PageCache<S, E>, fd: Fd) -> Self {
        Self { cache, fd }
    }

    pub fn fd(&self) -> Fd {
        self.fd
    }
}

impl<'a, S, E> Read for FileHandle<'a, S, E>
where
    S: Store,
    E: Evictor,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.cache.read(self.fd, buf)?)
    }
}

impl<'a, S, E> Write for FileHandle<'a, S, E>
where
    S: Store,
    E: Evictor,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.cache.write(self.fd, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.cache.sync(self.fd)?)
    }
}

impl<'a, S, E> Seek for FileHandle<'a, S, E>
where
    S: Store,
{
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(_) => return Ok(self.cache.seek(self.fd, pos)?),
            SeekFrom::Current(delta) => (self.cache.position(self.fd)?, delta),
            SeekFrom::End(delta) => (self.cache.size(self.fd)?, delta),
        };

        let target = if delta >= 0 {
            base.checked_add(delta as u64)
        } else {
            base.checked_sub(delta.unsigned_abs())
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;

        Ok(self.cache.seek(self.fd, SeekFrom::Start(target))?)
    }
}
