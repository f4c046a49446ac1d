use std::{
    fs::{self, OpenOptions},
    io,
    os::windows::fs::FileExt,
    path::Path,
};

#[derive(Debug)]
pub struct File {
    file: fs::File,
}

impl File {
    // Permission bits and unbuffered I/O are not mapped on windows.
    pub fn open_with(
        path: &Path,
        open_options: OpenOptions,
        _direct: bool,
        _mode: u32,
    ) -> io::Result<Self> {
        let file = open_options.open(path)?;
        Ok(Self { file })
    }

    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.seek_read(buf, offset)
    }

    pub fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.file.seek_write(buf, offset)
    }

    pub fn sync_all(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
