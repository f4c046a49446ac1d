//! Page key index.
//!
//! A fixed-size open addressing table mapping [PageKey]s to slot indices, using
//! linear probing and tombstone deletion. The table is never resized or compacted;
//! it relies on the number of live keys never exceeding a quarter of its capacity.

use crate::types::PageKey;

/// How many table entries to allocate per cache slot.
pub const TABLE_FACTOR: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Empty,
    Occupied { key: PageKey, slot: usize },
    Tombstone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

#[derive(Debug)]
pub struct KeyIndex {
    entries: Box<[Entry]>,
    live: usize,
}

impl KeyIndex {
    /// Create an index for a cache with `slots` slots.
    pub fn for_slots(slots: usize) -> Self {
        let entries = vec![Entry::Empty; slots * TABLE_FACTOR].into_boxed_slice();
        Self { entries, live: 0 }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn lookup(&self, key: PageKey) -> Option<usize> {
        match self.probe(key) {
            Probe::Found(i) => match self.entries[i] {
                Entry::Occupied { slot, .. } => Some(slot),
                _ => None,
            },
            _ => None,
        }
    }

    /// The table entry holding `key`.
    #[cfg(test)]
    fn entry_of(&self, key: PageKey) -> Option<usize> {
        match self.probe(key) {
            Probe::Found(i) => Some(i),
            _ => None,
        }
    }

    /// Bind `key` to `slot`, replacing any existing binding for the key.
    ///
    /// # Panics
    /// If the table has no free entry left. This cannot happen while the number of
    /// live keys is bounded by the slot count.
    pub fn insert(&mut self, key: PageKey, slot: usize) {
        let i = match self.probe(key) {
            Probe::Found(i) => i,
            Probe::Vacant(i) => {
                self.live += 1;
                i
            }
            Probe::Full => panic!("page key index is full"),
        };
        self.entries[i] = Entry::Occupied { key, slot };
    }

    /// Remove `key`, returning the slot it was bound to.
    pub fn erase(&mut self, key: PageKey) -> Option<usize> {
        let i = match self.probe(key) {
            Probe::Found(i) => i,
            _ => return None,
        };
        match std::mem::replace(&mut self.entries[i], Entry::Tombstone) {
            Entry::Occupied { slot, .. } => {
                self.live -= 1;
                Some(slot)
            }
            _ => None,
        }
    }

    /// Walk the probe sequence for `key`. A miss reports the first tombstone on the
    /// path so inserts reuse it instead of lengthening the chain.
    fn probe(&self, key: PageKey) -> Probe {
        let cap = self.entries.len();
        let start = (hash_key(key) % cap as u64) as usize;

        let mut first_tomb = None;
        for step in 0..cap {
            let i = (start + step) % cap;
            match self.entries[i] {
                Entry::Empty => return Probe::Vacant(first_tomb.unwrap_or(i)),
                Entry::Tombstone => {
                    first_tomb.get_or_insert(i);
                }
                Entry::Occupied { key: k, .. } if k == key => return Probe::Found(i),
                Entry::Occupied { .. } => {}
            }
        }

        first_tomb.map_or(Probe::Full, Probe::Vacant)
    }
}

/// Mix the descriptor and page number so that neighbouring pages of one file
/// land far apart in the table.
pub fn hash_key(key: PageKey) -> u64 {
    mix64((u64::from(key.fd.as_raw()) << 32) ^ key.page)
}

/// The 64-bit finalizer from MurmurHash3.
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{hash_key, KeyIndex, TABLE_FACTOR};
    use crate::types::{Fd, PageKey};

    fn key(fd: u32, page: u64) -> PageKey {
        PageKey::new(Fd::from_raw(fd), page)
    }

    #[test]
    fn insert_lookup_erase() {
        let mut index = KeyIndex::for_slots(4);
        assert_eq!(index.capacity(), 4 * TABLE_FACTOR);

        index.insert(key(3, 0), 1);
        index.insert(key(3, 1), 2);
        index.insert(key(4, 0), 3);
        assert_eq!(index.len(), 3);

        assert_eq!(index.lookup(key(3, 0)), Some(1));
        assert_eq!(index.lookup(key(3, 1)), Some(2));
        assert_eq!(index.lookup(key(4, 0)), Some(3));
        assert_eq!(index.lookup(key(4, 1)), None);

        assert_eq!(index.erase(key(3, 1)), Some(2));
        assert_eq!(index.erase(key(3, 1)), None);
        assert_eq!(index.lookup(key(3, 1)), None);
        assert_eq!(index.len(), 2);

        // Rebinding an existing key does not add a live entry.
        index.insert(key(3, 0), 0);
        assert_eq!(index.lookup(key(3, 0)), Some(0));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn tombstones_do_not_break_chains() {
        // A single slot gives a table of four entries, so every key collides.
        let mut index = KeyIndex::for_slots(1);
        let keys: Vec<_> = (0..4).map(|p| key(0, p)).collect();

        for (slot, k) in keys.iter().enumerate() {
            index.insert(*k, slot);
        }
        for k in &keys[..3] {
            index.erase(*k);
        }
        // The survivor is still reachable past three tombstones.
        assert_eq!(index.lookup(keys[3]), Some(3));

        // Churn through many more keys than the table holds; tombstones get reused.
        index.erase(keys[3]);
        for page in 100..10_000 {
            index.insert(key(0, page), 0);
            assert_eq!(index.lookup(key(0, page)), Some(0));
            index.erase(key(0, page));
            assert_eq!(index.len(), 0);
        }
    }

    #[test]
    fn inserts_reuse_the_first_tombstone() {
        let mut index = KeyIndex::for_slots(8);
        let cap = index.capacity() as u64;
        let home = |k| hash_key(k) % cap;

        // Three keys sharing one home entry.
        let target = home(key(2, 0));
        let keys: Vec<_> = (0..)
            .map(|p| key(2, p))
            .filter(|k| home(*k) == target)
            .take(3)
            .collect();
        let (a, b, c) = (keys[0], keys[1], keys[2]);

        index.insert(a, 0);
        index.insert(b, 1);
        let a_entry = index.entry_of(a).unwrap();
        let b_entry = index.entry_of(b).unwrap();
        assert_eq!(a_entry as u64, target);

        index.erase(a);
        index.insert(c, 2);
        assert_eq!(index.entry_of(c), Some(a_entry));
        assert_eq!(index.entry_of(b), Some(b_entry));
        assert_eq!(index.lookup(c), Some(2));
        assert_eq!(index.lookup(b), Some(1));
    }

    #[test]
    fn hash_spreads_adjacent_pages() {
        let cap = 1024;
        let buckets: HashSet<_> = (0..64).map(|p| hash_key(key(5, p)) % cap).collect();
        assert!(buckets.len() > 56, "{} distinct buckets", buckets.len());
        assert_ne!(hash_key(key(1, 0)), hash_key(key(0, 1)));
    }
}
