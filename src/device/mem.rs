use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};

use super::{Device, OpenFlags, Store};

/// A store that keeps every file in memory, keyed by path.
///
/// Files outlive the devices opened on them, so a file can be written, closed and
/// reopened just like one on disk.
#[derive(Debug, Default)]
pub struct MemStore {
    files: Mutex<HashMap<PathBuf, Arc<RwLock<Vec<u8>>>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// A copy of the current contents of `path`, if it exists.
    pub fn contents<P>(&self, path: P) -> Option<Vec<u8>>
    where
        P: AsRef<Path>,
    {
        let files = self.files.lock();
        files.get(path.as_ref()).map(|data| data.read().clone())
    }
}

impl Store for MemStore {
    type Device = MemDevice;

    fn open(&self, path: &Path, flags: OpenFlags, _mode: u32) -> io::Result<MemDevice> {
        let mut files = self.files.lock();

        let data = match files.get(path).cloned() {
            Some(_) if flags.contains(OpenFlags::CREATE | OpenFlags::EXCLUSIVE) => {
                return Err(io::ErrorKind::AlreadyExists.into());
            }
            Some(data) => data,
            None if flags.contains(OpenFlags::CREATE) => {
                let data = Arc::new(RwLock::new(Vec::new()));
                files.insert(path.to_owned(), data.clone());
                data
            }
            None => return Err(io::ErrorKind::NotFound.into()),
        };

        let writable = flags.contains(OpenFlags::WRITE);
        if flags.contains(OpenFlags::TRUNCATE) {
            if !writable {
                return Err(io::ErrorKind::InvalidInput.into());
            }
            data.write().clear();
        }

        Ok(MemDevice {
            data,
            readable: flags.contains(OpenFlags::READ),
            writable,
        })
    }
}

#[derive(Debug)]
pub struct MemDevice {
    data: Arc<RwLock<Vec<u8>>>,
    readable: bool,
    writable: bool,
}

impl Device for MemDevice {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if !self.readable {
            return Err(not_permitted());
        }

        let data = self.data.read();
        let start = match usize::try_from(offset) {
            Ok(start) if start < data.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        if !self.writable {
            return Err(not_permitted());
        }

        let end = usize::try_from(offset)
            .ok()
            .and_then(|start| start.checked_add(buf.len()))
            .ok_or_else(oom)?;
        let start = end - buf.len();

        let mut data = self.data.write();
        if data.len() < end {
            let additional = end - data.len();
            data.try_reserve(additional).map_err(|_| oom())?;
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.data.read().len() as u64)
    }
}

fn oom() -> io::Error {
    io::Error::new(io::ErrorKind::OutOfMemory, "in-memory file too large")
}

fn not_permitted() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "file not opened for this access")
}

#[cfg(test)]
mod tests {
    use std::{io, path::Path};

    use super::MemStore;
    use crate::device::{Device, OpenFlags, Store};

    #[test]
    fn open_flags() {
        let store = MemStore::new();
        let path = Path::new("a");

        assert!(store.open(path, OpenFlags::READ, 0).is_err());

        let dev = store
            .open(path, OpenFlags::READ_WRITE | OpenFlags::CREATE, 0o644)
            .unwrap();
        assert_eq!(dev.write_at(b"hello", 2).unwrap(), 5);
        assert_eq!(store.contents(path).unwrap(), b"\0\0hello");

        assert!(store
            .open(path, OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::EXCLUSIVE, 0)
            .is_err());

        let ro = store.open(path, OpenFlags::READ, 0).unwrap();
        assert!(ro.write_at(b"x", 0).is_err());

        let mut buf = [0; 16];
        assert_eq!(ro.read_at(&mut buf, 4).unwrap(), 3);
        assert_eq!(&buf[..3], b"llo");
        assert_eq!(ro.read_at(&mut buf, 100).unwrap(), 0);

        store
            .open(path, OpenFlags::WRITE | OpenFlags::TRUNCATE, 0)
            .unwrap();
        assert_eq!(ro.len().unwrap(), 0);
    }

    #[test]
    fn huge_writes_fail_without_aborting() {
        let store = MemStore::new();
        let dev = store
            .open(Path::new("big"), OpenFlags::READ_WRITE | OpenFlags::CREATE, 0o644)
            .unwrap();
        dev.write_at(b"head", 0).unwrap();

        for offset in [1 << 46, u64::MAX] {
            let err = dev.write_at(b"x", offset).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::OutOfMemory);
        }
        assert_eq!(dev.len().unwrap(), 4);
    }
}
