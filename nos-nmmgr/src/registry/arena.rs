//! Slot storage for registered handlers
//!
//! Records live in generational slots so a stale [`HandlerId`] can never
//! reach a record that later reuses the same slot. Membership order is kept
//! separately: the newest entry is at the back of `order` and traversal runs
//! back to front, which gives head-insertion lookup semantics.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::handler::Handler;

/// Identity of a registered record
///
/// A slot whose generation reaches `u32::MAX` is retired rather than reused,
/// so an id is never reissued to a different record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    index: u32,
    generation: u32,
}

impl HandlerId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Who releases a record when it leaves the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Registry drops the record on removal (`NEEDS_FREE`)
    Registry,
    /// Registering owner keeps the record alive independently
    Owner,
}

/// A linked record
pub(crate) struct Entry {
    pub(crate) record: Arc<Handler>,
    pub(crate) ownership: Ownership,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<u32>,
}

impl Arena {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn insert(&mut self, entry: Entry) -> HandlerId {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                (self.slots.len() - 1) as u32
            }
        };
        self.order.push(index);
        HandlerId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    pub(crate) fn get(&self, id: HandlerId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn remove(&mut self, id: HandlerId) -> Option<Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        Self::retire_or_free(slot, id.index, &mut self.free);

        if let Some(pos) = self.order.iter().rposition(|&i| i == id.index) {
            self.order.remove(pos);
        }
        Some(entry)
    }

    /// Bump a vacated slot's generation; exhausted slots never return to the
    /// free list
    fn retire_or_free(slot: &mut Slot, index: u32, free: &mut Vec<u32>) {
        if slot.generation == u32::MAX {
            return;
        }
        slot.generation += 1;
        free.push(index);
    }

    /// Entries newest first
    pub(crate) fn iter(&self) -> impl Iterator<Item = (HandlerId, &Entry)> + '_ {
        self.order.iter().rev().filter_map(move |&index| {
            let slot = &self.slots[index as usize];
            let entry = slot.entry.as_ref()?;
            Some((HandlerId { index, generation: slot.generation }, entry))
        })
    }

    /// Unlink everything, newest first
    pub(crate) fn drain(&mut self) -> Vec<Entry> {
        let mut drained = Vec::with_capacity(self.order.len());
        while let Some(index) = self.order.pop() {
            let slot = &mut self.slots[index as usize];
            if let Some(entry) = slot.entry.take() {
                Self::retire_or_free(slot, index, &mut self.free);
                drained.push(entry);
            }
        }
        drained
    }
}
