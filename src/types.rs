use std::fmt;

/// A descriptor handed out by [PageCache::open](crate::PageCache::open).
///
/// Descriptors are small integers bounded by the cache's descriptor limit. The
/// lowest free value is reused first, mirroring how an operating system hands out
/// file descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fd(u32);

impl Fd {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity of a cached page: which descriptor it belongs to and where in
/// that file it lives, in units of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageKey {
    pub fd: Fd,
    pub page: u64,
}

impl PageKey {
    pub fn new(fd: Fd, page: u64) -> Self {
        Self { fd, page }
    }
}
