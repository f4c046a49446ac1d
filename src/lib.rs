#![forbid(unsafe_op_in_unsafe_fn)]

//! A fixed-capacity, write-back page cache over a byte-addressable backing store.
//!
//! Callers open files through a [PageCache] and read, write, seek and sync them
//! by descriptor. Reads and writes are split into page-sized segments which are
//! served from a fixed arena of page buffers; dirty pages reach the backing store
//! when they are evicted, when their descriptor is synced, or when it is closed.

use std::{io, result};

use thiserror::Error;

pub mod device;
mod page_cache;
mod sys;
mod types;
mod util;

pub use self::{
    device::{Device, OpenFlags, Store},
    page_cache::{
        eviction::{Evictor, RandomEviction},
        handle::FileHandle,
        CacheStats, PageCache, PageCacheBuilder,
    },
    types::{Fd, PageKey},
    util::AllocError,
};

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("bad file descriptor: {0}")]
    BadDescriptor(Fd),
    #[error("page buffer allocation failed")]
    OutOfMemory,
    /// Every entry of the descriptor table is in use.
    #[error("too many open files")]
    TooManyOpenFiles,
    /// The backing store failed a read, write, sync or size query. Short page
    /// writes are reported here as [io::ErrorKind::WriteZero].
    #[error("unexpected io error occurred: {0:?}")]
    IoError(#[from] io::Error),
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn into_kind(self) -> ErrorKind {
        *self.kind
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    #[inline]
    fn from(error: E) -> Self {
        Error {
            kind: Box::new(error.into()),
        }
    }
}

impl From<io::ErrorKind> for ErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        io::Error::from(kind).into()
    }
}

impl From<AllocError> for ErrorKind {
    fn from(_: AllocError) -> Self {
        ErrorKind::OutOfMemory
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error.into_kind() {
            ErrorKind::IoError(err) => err,
            ErrorKind::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            ErrorKind::OutOfMemory => io::ErrorKind::OutOfMemory.into(),
            kind => io::Error::new(io::ErrorKind::Other, kind.to_string()),
        }
    }
}
