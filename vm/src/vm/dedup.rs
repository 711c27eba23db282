//! # Transaction Deduplicator
//!
//! Bounded map from transaction ID to the one canonical [`UniqueTx`] for it.
//!
//! ## Design Decisions
//!
//! - **Arena + intrusive list**: entries live in a `Vec` of slots linked
//!   into a recency list by index, with a free list for reuse. Lookup is a
//!   `HashMap` probe, touch and insert are pointer swaps.
//! - **Only unreferenced entries are evicted**: an entry whose `Arc` is held
//!   anywhere besides this cache is someone's live view; evicting it would
//!   let a second canonical object appear for the same ID. When every
//!   entry is referenced the cache grows past capacity instead, and shrinks
//!   back as references drop and new inserts evict.

use std::collections::HashMap;
use std::sync::Arc;

use super::unique_tx::UniqueTx;
use crate::ids::Id;

#[derive(Debug)]
struct Slot {
    entry: Option<Arc<UniqueTx>>,
    /// Toward the most recently used end.
    prev: Option<usize>,
    /// Toward the least recently used end.
    next: Option<usize>,
}

/// Whether [`TxDeduplicator::deduplicate`] found an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
}

#[derive(Debug)]
pub struct TxDeduplicator {
    capacity: usize,
    slots: Vec<Slot>,
    index: HashMap<Id, usize>,
    free: Vec<usize>,
    /// Most recently used.
    head: Option<usize>,
    /// Least recently used.
    tail: Option<usize>,
}

impl TxDeduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::with_capacity(capacity.min(1024)),
            index: HashMap::with_capacity(capacity.min(1024)),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the canonical entry for `candidate`'s ID, inserting the
    /// candidate if none exists.
    ///
    /// If the canonical entry has no body yet and the candidate does, the
    /// body moves over.
    pub fn deduplicate(&mut self, candidate: Arc<UniqueTx>) -> (Arc<UniqueTx>, Lookup) {
        let id = candidate.id();
        if let Some(&slot) = self.index.get(&id) {
            self.touch(slot);
            if let Some(canonical) = self.slots[slot].entry.clone() {
                if let Some(tx) = candidate.tx() {
                    canonical.set_tx_if_missing(tx);
                }
                return (canonical, Lookup::Hit);
            }
        }

        if self.index.len() >= self.capacity {
            self.evict_one();
        }
        self.insert_front(candidate.clone());
        (candidate, Lookup::Miss)
    }

    /// Drops the least recently used entry nobody else holds.
    fn evict_one(&mut self) -> bool {
        let mut cursor = self.tail;
        while let Some(slot) = cursor {
            let victim = self.slots[slot]
                .entry
                .as_ref()
                .filter(|entry| Arc::strong_count(entry) == 1)
                .map(|entry| entry.id());
            if let Some(id) = victim {
                self.unlink(slot);
                self.slots[slot].entry = None;
                self.index.remove(&id);
                self.free.push(slot);
                return true;
            }
            cursor = self.slots[slot].prev;
        }
        false
    }

    fn insert_front(&mut self, entry: Arc<UniqueTx>) {
        let id = entry.id();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Slot {
                    entry: Some(entry),
                    prev: None,
                    next: None,
                };
                slot
            }
            None => {
                self.slots.push(Slot {
                    entry: Some(entry),
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        self.link_front(slot);
    }

    fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    fn link_front(&mut self, slot: usize) {
        self.slots[slot].prev = None;
        self.slots[slot].next = self.head;
        if let Some(old_head) = self.head {
            self.slots[old_head].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[slot].prev = None;
        self.slots[slot].next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> Id {
        Id::new([n; 32])
    }

    fn utx(n: u8) -> Arc<UniqueTx> {
        Arc::new(UniqueTx::new(id(n)))
    }

    #[test]
    fn second_lookup_returns_same_object() {
        let mut dedup = TxDeduplicator::new(4);
        let (first, lookup) = dedup.deduplicate(utx(1));
        assert_eq!(lookup, Lookup::Miss);
        let (second, lookup) = dedup.deduplicate(utx(1));
        assert_eq!(lookup, Lookup::Hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn evicts_least_recent_unreferenced() {
        let mut dedup = TxDeduplicator::new(2);
        dedup.deduplicate(utx(1));
        dedup.deduplicate(utx(2));
        // Touch 1 so 2 becomes least recent.
        dedup.deduplicate(utx(1));
        dedup.deduplicate(utx(3));

        assert_eq!(dedup.len(), 2);
        assert!(dedup.contains(&id(1)));
        assert!(!dedup.contains(&id(2)));
        assert!(dedup.contains(&id(3)));
    }

    #[test]
    fn referenced_entries_survive_and_capacity_is_exceeded() {
        let mut dedup = TxDeduplicator::new(2);
        let (a, _) = dedup.deduplicate(utx(1));
        let (b, _) = dedup.deduplicate(utx(2));
        let (c, _) = dedup.deduplicate(utx(3));

        assert_eq!(dedup.len(), 3);
        assert!(dedup.contains(&id(1)) && dedup.contains(&id(2)));

        // Releasing a reference makes its entry evictable again.
        drop(a);
        let (_d, _) = dedup.deduplicate(utx(4));
        assert!(!dedup.contains(&id(1)));
        assert_eq!(dedup.len(), 3);
        drop((b, c));
    }

    #[test]
    fn skips_referenced_tail_for_older_free_entry() {
        let mut dedup = TxDeduplicator::new(2);
        let (held, _) = dedup.deduplicate(utx(1));
        dedup.deduplicate(utx(2));
        dedup.deduplicate(utx(3));

        assert!(dedup.contains(&id(1)));
        assert!(!dedup.contains(&id(2)));
        assert!(dedup.contains(&id(3)));
        drop(held);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut dedup = TxDeduplicator::new(1);
        for n in 0..10 {
            dedup.deduplicate(utx(n));
        }
        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.slots.len(), 1);
        assert!(dedup.contains(&id(9)));
    }
}
