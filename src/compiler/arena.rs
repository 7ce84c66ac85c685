//! Generational arena owning the elements a rewrite operates on.
//!
//! Elements are stored in slots and referred to by [`Handle`]s. A handle records the slot index
//! and the slot's generation at insertion time. Removing an element bumps the generation, so any
//! handle still pointing at the slot becomes stale and every lookup through it fails instead of
//! silently reaching whatever element reuses the slot.
//!
//! # Examples
//!
//! ```rust
//! use optcore::compiler::Arena;
//!
//! let mut arena = Arena::new();
//! let add = arena.insert("add");
//! let mul = arena.insert("mul");
//!
//! assert_eq!(arena.remove(add), Some("add"));
//! assert!(arena.get(add).is_none());
//!
//! // The freed slot is reused, but the old handle stays dead
//! let shl = arena.insert("shl");
//! assert_eq!(shl.index(), add.index());
//! assert_ne!(shl, add);
//! assert_eq!(arena.get(mul), Some(&"mul"));
//! ```

use std::fmt;

/// A generation-checked reference to an element in an [`Arena`].
///
/// Handles are `Copy` and carry no borrow, so they can be stored freely in worklists and side
/// tables. Identity is by value: two handles are equal exactly when they name the same slot
/// in the same generation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Returns the slot index.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Returns the generation the handle was created in.
    #[must_use]
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}.{}", self.index, self.generation)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.index)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with stable, generation-checked handles.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Creates an empty arena with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Returns the number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no element is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots would be needed.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).expect("arena exceeds u32::MAX slots");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle {
            index,
            generation: 0,
        }
    }

    /// Removes the element behind `handle`, returning it.
    ///
    /// Returns `None` for stale handles.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(value)
    }

    /// Returns `true` if `handle` refers to a live element.
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Returns the element behind `handle`, or `None` if the handle is stale.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutable counterpart of [`Arena::get`].
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Iterates over live elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Returns the handles of all live elements in slot order.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut arena = Arena::new();
        assert!(arena.is_empty());

        let a = arena.insert(10);
        let b = arena.insert(20);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&10));

        *arena.get_mut(b).unwrap() += 1;
        assert_eq!(arena.get(b), Some(&21));

        assert_eq!(arena.remove(a), Some(10));
        assert_eq!(arena.remove(a), None);
        assert!(!arena.contains(a));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn stale_handles_after_reuse() {
        let mut arena = Arena::new();
        let old = arena.insert('x');
        arena.remove(old);
        let new = arena.insert('y');

        assert_eq!(old.index(), new.index());
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(arena.get(old).is_none());
        assert!(arena.get_mut(old).is_none());
        assert_eq!(arena.remove(old), None);
        assert_eq!(arena.get(new), Some(&'y'));
    }

    #[test]
    fn iteration_skips_holes() {
        let mut arena = Arena::with_capacity(4);
        let handles: Vec<_> = (0..4).map(|i| arena.insert(i)).collect();
        arena.remove(handles[1]);
        arena.remove(handles[2]);

        let live: Vec<_> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(live, vec![0, 3]);
        assert_eq!(arena.handles(), vec![handles[0], handles[3]]);
    }

    #[test]
    fn formatting() {
        let mut arena = Arena::new();
        let h = arena.insert(());
        assert_eq!(format!("{h:?}"), "%0.0");
        assert_eq!(format!("{h}"), "%0");
    }

    #[test]
    fn out_of_range_handle() {
        let mut big = Arena::new();
        for i in 0..8 {
            big.insert(i);
        }
        let far = big.handles()[7];

        let small: Arena<i32> = Arena::new();
        assert!(small.get(far).is_none());
    }
}
