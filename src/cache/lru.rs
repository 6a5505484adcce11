//! Arena LRU list
//!
//! Recency chain stored in a slot arena addressed by integer indices.
//! Freed slots go on a free list and are reused by later inserts; a hash
//! map resolves keys to slots. All operations are O(1).

use std::collections::HashMap;
use std::hash::Hash;

/// One occupied arena slot
struct Slot<K, V> {
    key: K,
    value: V,
    /// Neighbour towards the most recently used end
    newer: Option<usize>,
    /// Neighbour towards the least recently used end
    older: Option<usize>,
}

/// Doubly-linked recency list over an arena of slots
pub(crate) struct LruList<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    oldest: Option<usize>,
    newest: Option<usize>,
}

impl<K, V> LruList<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            oldest: None,
            newest: None,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert at the most recently used position.
    ///
    /// Returns `false` and leaves the list untouched when the key is
    /// already present.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }

        let slot = Slot {
            key: key.clone(),
            value,
            newer: None,
            older: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        self.index.insert(key, id);
        self.link_newest(id);
        true
    }

    /// Look up a value and promote it to most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        if self.newest != Some(id) {
            self.unlink(id);
            self.link_newest(id);
        }
        self.slots[id].as_ref().map(|slot| &slot.value)
    }

    /// Look up a value without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.slots[id].as_ref().map(|slot| &slot.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.unlink(id);
        let slot = self.slots[id].take()?;
        self.free.push(id);
        Some(slot.value)
    }

    /// Least recently used entry
    pub fn oldest(&self) -> Option<(&K, &V)> {
        let id = self.oldest?;
        self.slots[id].as_ref().map(|slot| (&slot.key, &slot.value))
    }

    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        let id = self.oldest?;
        let key = self.slots[id].as_ref()?.key.clone();
        let value = self.remove(&key)?;
        Some((key, value))
    }

    /// Mutable access to every entry, in no particular order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.slots
            .iter_mut()
            .flatten()
            .map(|slot| (&slot.key, &mut slot.value))
    }

    /// Keys from least to most recently used
    pub fn keys_oldest_first(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.oldest;
        while let Some(id) = cursor {
            let Some(slot) = self.slots[id].as_ref() else {
                break;
            };
            keys.push(slot.key.clone());
            cursor = slot.newer;
        }
        keys
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Detach a slot from the chain, repairing its neighbours and the ends
    fn unlink(&mut self, id: usize) {
        let (newer, older) = match self.slots[id].as_mut() {
            Some(slot) => (slot.newer.take(), slot.older.take()),
            None => return,
        };

        match older {
            Some(older_id) => {
                if let Some(slot) = self.slots[older_id].as_mut() {
                    slot.newer = newer;
                }
            }
            None => self.oldest = newer,
        }
        match newer {
            Some(newer_id) => {
                if let Some(slot) = self.slots[newer_id].as_mut() {
                    slot.older = older;
                }
            }
            None => self.newest = older,
        }
    }

    /// Attach a detached slot at the most recently used end
    fn link_newest(&mut self, id: usize) {
        let previous = self.newest;
        if let Some(slot) = self.slots[id].as_mut() {
            slot.older = previous;
            slot.newer = None;
        }
        match previous {
            Some(prev_id) => {
                if let Some(slot) = self.slots[prev_id].as_mut() {
                    slot.newer = Some(id);
                }
            }
            None => self.oldest = Some(id),
        }
        self.newest = Some(id);
    }
}
