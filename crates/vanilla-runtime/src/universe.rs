//! The allocation universe
//!
//! Every value created through a [`Context`](crate::Context) lives in one
//! [`Universe`]: a generational arena whose occupied slots are additionally
//! threaded into a circular doubly linked ring. New values are spliced into
//! the ring next to the entry slot in O(1); reclaimed values are unlinked in
//! O(1). Following `next` from any member walks every live value exactly
//! once before returning to the start.
//!
//! Reclamation is reference counting over per-value anchors:
//!
//! - an allocation starts with one anchor, owned by whoever asked for it;
//! - [`Universe::anchor`] adds one, [`Universe::release`] drops one;
//! - at zero the value is unlinked and its slot freed, and every handle it
//!   held is released in turn;
//! - pinned values (the context's singletons and literals) ignore both and
//!   are never unlinked, so the ring stays non-empty once a context exists.
//!
//! Reference cycles between containers are not collected.

use slotmap::SlotMap;

use crate::error::{RuntimeError, RuntimeResult};
use crate::handle::Handle;
use crate::value::Value;

struct Slot {
    value: Value,
    anchors: u32,
    pinned: bool,
    prev: Handle,
    next: Handle,
}

/// Allocation counters for diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UniverseStats {
    pub allocated: u64,
    pub reclaimed: u64,
    pub peak: u64,
}

impl UniverseStats {
    pub fn live(&self) -> u64 {
        self.allocated - self.reclaimed
    }
}

pub struct Universe {
    slots: SlotMap<Handle, Slot>,
    entry: Option<Handle>,
    stats: UniverseStats,
}

impl Universe {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            entry: None,
            stats: UniverseStats::default(),
        }
    }

    /// Track a new value and return its handle. The value starts with one
    /// anchor.
    pub fn allocate(&mut self, value: Value) -> Handle {
        let handle = match self.entry {
            None => {
                let handle = self.slots.insert_with_key(|key| Slot {
                    value,
                    anchors: 1,
                    pinned: false,
                    prev: key,
                    next: key,
                });
                self.entry = Some(handle);
                handle
            }
            Some(next) => {
                let prev = self.slots[next].prev;
                let handle = self.slots.insert(Slot {
                    value,
                    anchors: 1,
                    pinned: false,
                    prev,
                    next,
                });
                self.slots[prev].next = handle;
                self.slots[next].prev = handle;
                handle
            }
        };

        self.stats.allocated += 1;
        self.stats.peak = self.stats.peak.max(self.stats.live());
        handle
    }

    /// Allocate a value that is never reclaimed.
    pub(crate) fn allocate_pinned(&mut self, value: Value) -> Handle {
        let handle = self.allocate(value);
        self.slots[handle].pinned = true;
        handle
    }

    pub(crate) fn pin(&mut self, handle: Handle) -> RuntimeResult<()> {
        self.slot_mut(handle)?.pinned = true;
        Ok(())
    }

    fn slot(&self, handle: Handle) -> RuntimeResult<&Slot> {
        self.slots.get(handle).ok_or(RuntimeError::StaleHandle)
    }

    fn slot_mut(&mut self, handle: Handle) -> RuntimeResult<&mut Slot> {
        self.slots.get_mut(handle).ok_or(RuntimeError::StaleHandle)
    }

    pub fn get(&self, handle: Handle) -> RuntimeResult<&Value> {
        self.slot(handle).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> RuntimeResult<&mut Value> {
        self.slot_mut(handle).map(|slot| &mut slot.value)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slots.contains_key(handle)
    }

    pub fn is_pinned(&self, handle: Handle) -> RuntimeResult<bool> {
        self.slot(handle).map(|slot| slot.pinned)
    }

    /// Current anchor count of a value.
    pub fn anchors(&self, handle: Handle) -> RuntimeResult<u32> {
        self.slot(handle).map(|slot| slot.anchors)
    }

    /// Add an anchor to a value. No-op for pinned values.
    pub fn anchor(&mut self, handle: Handle) -> RuntimeResult<()> {
        let slot = self.slot_mut(handle)?;
        if !slot.pinned {
            slot.anchors = slot.anchors.saturating_add(1);
        }
        Ok(())
    }

    /// Drop an anchor from a value, reclaiming it (and releasing everything
    /// it holds) when no anchors remain. No-op for pinned values.
    pub fn release(&mut self, handle: Handle) -> RuntimeResult<()> {
        if !self.contains(handle) {
            tracing::warn!(?handle, "release of a reclaimed value");
            return Err(RuntimeError::StaleHandle);
        }

        let mut pending = vec![handle];
        while let Some(next) = pending.pop() {
            // Children of a reclaimed container may already be gone if the
            // same handle was stored several times and reached zero earlier.
            let Some(slot) = self.slots.get_mut(next) else {
                continue;
            };
            if slot.pinned {
                continue;
            }
            slot.anchors = slot.anchors.saturating_sub(1);
            if slot.anchors > 0 {
                continue;
            }

            let Some(slot) = self.unlink(next) else {
                continue;
            };
            tracing::trace!(handle = ?next, tag = %slot.value.tag(), "reclaimed value");
            pending.extend(slot.value.children());
        }
        Ok(())
    }

    fn unlink(&mut self, handle: Handle) -> Option<Slot> {
        let slot = self.slots.remove(handle)?;

        if slot.next == handle {
            self.entry = None;
        } else {
            self.slots[slot.prev].next = slot.next;
            self.slots[slot.next].prev = slot.prev;
            if self.entry == Some(handle) {
                self.entry = Some(slot.next);
            }
        }

        self.stats.reclaimed += 1;
        Some(slot)
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> UniverseStats {
        self.stats
    }

    /// An arbitrary live member of the ring, if any.
    pub fn entry(&self) -> Option<Handle> {
        self.entry
    }

    /// The member following `handle` in the ring.
    pub fn next_of(&self, handle: Handle) -> RuntimeResult<Handle> {
        self.slot(handle).map(|slot| slot.next)
    }

    /// The member preceding `handle` in the ring.
    pub fn prev_of(&self, handle: Handle) -> RuntimeResult<Handle> {
        self.slot(handle).map(|slot| slot.prev)
    }

    /// Walk the ring starting at `start`, yielding each member once.
    pub fn ring(&self, start: Handle) -> Ring<'_> {
        Ring {
            universe: self,
            start,
            cursor: self.contains(start).then_some(start),
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the allocation ring, see [`Universe::ring`].
pub struct Ring<'a> {
    universe: &'a Universe,
    start: Handle,
    cursor: Option<Handle>,
}

impl Iterator for Ring<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        let current = self.cursor?;
        let next = self.universe.slots[current].next;
        self.cursor = (next != self.start).then_some(next);
        Some(current)
    }
}
