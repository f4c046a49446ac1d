use crate::{types::Fd, ErrorKind, Result};

/// Per-descriptor state: the open device plus the logical cursor and size.
#[derive(Debug)]
pub struct FileState<D> {
    pub device: D,
    pub cursor: u64,
    /// The size of the file as seen through the cache. This only grows; writes past
    /// the end extend it before their pages reach the backing store.
    pub size: u64,
}

/// A fixed-size table of open descriptors.
#[derive(Debug)]
pub struct FileTable<D> {
    files: Box<[Option<FileState<D>>]>,
}

impl<D> FileTable<D> {
    pub fn new(limit: usize) -> Self {
        let files = std::iter::repeat_with(|| None).take(limit).collect();
        Self { files }
    }

    /// Register an open device under the lowest free descriptor.
    pub fn insert(&mut self, device: D, size: u64) -> Result<Fd> {
        let index = self
            .files
            .iter()
            .position(Option::is_none)
            .ok_or(ErrorKind::TooManyOpenFiles)?;
        let raw = u32::try_from(index).map_err(|_| ErrorKind::TooManyOpenFiles)?;

        self.files[index] = Some(FileState {
            device,
            cursor: 0,
            size,
        });
        Ok(Fd::from_raw(raw))
    }

    pub fn get(&self, fd: Fd) -> Result<&FileState<D>> {
        self.files
            .get(fd.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| ErrorKind::BadDescriptor(fd).into())
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut FileState<D>> {
        self.files
            .get_mut(fd.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| ErrorKind::BadDescriptor(fd).into())
    }

    pub fn remove(&mut self, fd: Fd) -> Result<FileState<D>> {
        self.files
            .get_mut(fd.index())
            .and_then(Option::take)
            .ok_or_else(|| ErrorKind::BadDescriptor(fd).into())
    }

    /// Descriptors that are currently open.
    pub fn open_fds(&self) -> Vec<Fd> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| Fd::from_raw(i as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::FileTable;
    use crate::{types::Fd, ErrorKind};

    #[test]
    fn lowest_free_descriptor_first() {
        let mut table = FileTable::new(3);
        let a = table.insert((), 10).unwrap();
        let b = table.insert((), 20).unwrap();
        assert_eq!((a.as_raw(), b.as_raw()), (0, 1));
        assert_eq!(table.get(b).unwrap().size, 20);

        table.remove(a).unwrap();
        assert_eq!(table.insert((), 0).unwrap(), a);
        table.insert((), 0).unwrap();

        assert!(matches!(
            table.insert((), 0).unwrap_err().kind(),
            ErrorKind::TooManyOpenFiles
        ));
        assert_eq!(table.open_fds().len(), 3);
    }

    #[test]
    fn unknown_descriptors() {
        let mut table = FileTable::<()>::new(2);
        for raw in [0, 1, 2, 5000] {
            let fd = Fd::from_raw(raw);
            assert!(matches!(
                table.get(fd).unwrap_err().kind(),
                ErrorKind::BadDescriptor(bad) if *bad == fd
            ));
            assert!(table.remove(fd).is_err());
        }
    }
}
