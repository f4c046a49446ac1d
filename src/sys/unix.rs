use std::{
    fs::{self, OpenOptions},
    io,
    os::unix::{fs::OpenOptionsExt, prelude::FileExt},
    path::Path,
};

#[derive(Debug)]
pub struct File {
    file: fs::File,
}

impl File {
    #[cfg(target_os = "linux")]
    pub fn open_with(
        path: &Path,
        mut open_options: OpenOptions,
        direct: bool,
        mode: u32,
    ) -> io::Result<Self> {
        if direct {
            open_options.custom_flags(libc::O_DIRECT);
        }
        let file = open_options.mode(mode).open(path)?;
        Ok(Self { file })
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    pub fn open_with(
        path: &Path,
        mut open_options: OpenOptions,
        direct: bool,
        mode: u32,
    ) -> io::Result<Self> {
        use std::os::unix::io::AsRawFd;

        let file = open_options.mode(mode).open(path)?;
        if direct {
            let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_NOCACHE, 1) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(Self { file })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios")))]
    pub fn open_with(
        path: &Path,
        mut open_options: OpenOptions,
        _direct: bool,
        mode: u32,
    ) -> io::Result<Self> {
        let file = open_options.mode(mode).open(path)?;
        Ok(Self { file })
    }

    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.read_at(buf, offset)
    }

    pub fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.file.write_at(buf, offset)
    }

    pub fn sync_all(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
