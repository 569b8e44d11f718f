//! Handles to values tracked by the allocation universe
//!
//! A [`Handle`] is a generational index: the slot index plus the generation
//! the slot had when the value was allocated. Once a value is reclaimed its
//! slot generation moves on, so an old handle can never observe whatever is
//! allocated into the slot next. Lookups through a stale handle fail with
//! [`RuntimeError::StaleHandle`](crate::RuntimeError::StaleHandle).
//!
//! Two handles compare equal exactly when they name the same value, which is
//! what gives cached singletons their identity semantics.

slotmap::new_key_type! {
    /// An opaque, copyable reference to a runtime value.
    pub struct Handle;
}

impl Handle {
    /// A stable 64-bit identity for this handle, used when a container
    /// value is hashed as a map key.
    pub fn identity(self) -> u64 {
        slotmap::Key::data(&self).as_ffi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_stale_handle_is_not_reused() {
        let mut slots: SlotMap<Handle, i32> = SlotMap::with_key();
        let first = slots.insert(1);
        slots.remove(first);
        let second = slots.insert(2);

        // Same slot, different generation
        assert_ne!(first, second);
        assert!(slots.get(first).is_none());
        assert_eq!(slots.get(second), Some(&2));
    }

    #[test]
    fn test_identity_is_stable() {
        let mut slots: SlotMap<Handle, ()> = SlotMap::with_key();
        let a = slots.insert(());
        let b = slots.insert(());
        assert_eq!(a.identity(), a.identity());
        assert_ne!(a.identity(), b.identity());
    }
}
