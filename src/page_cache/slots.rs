use crate::{
    types::{Fd, PageKey},
    util::AlignedBuf,
    Result,
};

/// One physical page buffer and the page currently bound to it.
#[derive(Debug, Default)]
pub struct Slot {
    /// The page held by this slot. `None` means the slot is free.
    binding: Option<PageKey>,
    /// The buffer holds bytes not yet written to the backing store. Only ever set
    /// while the slot is bound.
    dirty: bool,
    /// Allocated on first use and kept for the lifetime of the arena.
    buffer: Option<AlignedBuf>,
}

impl Slot {
    pub fn binding(&self) -> Option<PageKey> {
        self.binding
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A fixed number of page buffers, indexed by slot number.
#[derive(Debug)]
pub struct SlotArena {
    slots: Box<[Slot]>,
    page_size: usize,
    align: usize,
}

impl SlotArena {
    pub fn new(count: usize, page_size: usize, align: usize) -> Self {
        let slots = std::iter::repeat_with(Slot::default).take(count).collect();
        Self {
            slots,
            page_size,
            align,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub fn find_free(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.binding.is_none())
    }

    /// The number of slots currently bound to a page.
    pub fn resident(&self) -> usize {
        self.slots.iter().filter(|s| s.binding.is_some()).count()
    }

    /// Indices of every slot bound to a page of `fd`.
    pub fn bound_to(&self, fd: Fd) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.binding, Some(key) if key.fd == fd))
            .map(|(i, _)| i)
            .collect()
    }

    /// The buffer of slot `index`, allocated zero-filled if this slot has never been
    /// used. Fails with [OutOfMemory](crate::ErrorKind::OutOfMemory) if the
    /// allocation does.
    pub fn buffer_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        let slot = &mut self.slots[index];
        let buffer = match slot.buffer.take() {
            Some(buffer) => buffer,
            None => AlignedBuf::try_zeroed(self.page_size, self.align)?,
        };
        let buffer: &mut [u8] = slot.buffer.insert(buffer);
        Ok(buffer)
    }

    /// Bind a free slot to `key`. Its buffer must already hold the page contents.
    pub fn bind(&mut self, index: usize, key: PageKey) {
        let slot = &mut self.slots[index];
        debug_assert!(slot.binding.is_none(), "binding an occupied slot");
        debug_assert!(slot.buffer.is_some(), "binding a slot without a buffer");
        slot.binding = Some(key);
        slot.dirty = false;
    }

    /// Release a slot. The buffer is kept for the next binding.
    pub fn unbind(&mut self, index: usize) -> Option<PageKey> {
        let slot = &mut self.slots[index];
        slot.dirty = false;
        slot.binding.take()
    }

    pub fn data(&self, index: usize) -> &[u8] {
        self.slots[index].buffer.as_deref().unwrap_or_default()
    }

    /// The buffer of a bound slot, marking it dirty.
    pub fn data_mut(&mut self, index: usize) -> &mut [u8] {
        let slot = &mut self.slots[index];
        debug_assert!(slot.binding.is_some(), "writing to a free slot");
        slot.dirty = true;
        slot.buffer.as_deref_mut().unwrap_or_default()
    }

    pub fn mark_clean(&mut self, index: usize) {
        self.slots[index].dirty = false;
    }
}
