use std::{
    alloc::{alloc_zeroed, dealloc, Layout},
    fmt,
    ops::{Deref, DerefMut},
    ptr::NonNull,
    slice,
};

use super::AllocError;

/// A zero-initialized, heap allocated byte buffer with a guaranteed alignment.
///
/// `Box<[u8]>` cannot be used here: it would be freed with the layout of `[u8]`,
/// not the layout it was allocated with.
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl AlignedBuf {
    /// Allocate `size` zeroed bytes aligned to `align`. Allocation failure is
    /// reported rather than aborting the process.
    pub fn try_zeroed(size: usize, align: usize) -> Result<Self, AllocError> {
        let layout = Layout::from_size_align(size, align).map_err(|_| AllocError)?;
        if layout.size() == 0 {
            return Err(AllocError);
        }

        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(AllocError)?;
        Ok(Self { ptr, layout })
    }
}

// The allocation is uniquely owned.
unsafe impl Send for AlignedBuf {}
unsafe impl Sync for AlignedBuf {}

impl Deref for AlignedBuf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl DerefMut for AlignedBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.layout.size())
            .field("align", &self.layout.align())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::AlignedBuf;

    #[test]
    fn zeroed_and_aligned() {
        let mut buf = AlignedBuf::try_zeroed(4096, 4096).unwrap();
        assert_eq!(buf.len(), 4096);
        assert_eq!(buf.as_ptr() as usize % 4096, 0);
        assert!(buf.iter().all(|b| *b == 0));

        buf.fill(7);
        assert!(buf.iter().all(|b| *b == 7));
    }

    #[test]
    fn rejects_bad_layouts() {
        assert!(AlignedBuf::try_zeroed(0, 8).is_err());
        assert!(AlignedBuf::try_zeroed(64, 3).is_err());
    }
}
