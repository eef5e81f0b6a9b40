//! Generational slot arena.
//!
//! Keys remember the arena and the generation of the slot they were issued
//! for. Freeing a slot bumps its generation, so every outstanding key to it
//! stops resolving even after the slot is reused. Keys carried over to a
//! different arena (another thread's runtime) never resolve.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA: AtomicU32 = AtomicU32::new(0);

/// A typed, generation-checked index into an [`Arena`].
///
/// The phantom type prevents mixing keys from different arenas.
pub(crate) struct Key<T> {
    arena: u32,
    index: u32,
    generation: u32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    fn new(arena: u32, index: u32, generation: u32) -> Self {
        Self {
            arena,
            index,
            generation,
            _ty: PhantomData,
        }
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arena.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}@{}", self.arena, self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Vec-backed arena with a free list
pub(crate) struct Arena<T> {
    id: u32,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Store a value, reusing a freed slot when one is available.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn alloc(&mut self, value: T) -> Key<T> {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Key::new(self.id, index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Key::new(self.id, index, 0)
    }

    fn slot_mut(&mut self, key: Key<T>) -> Option<&mut Slot<T>> {
        if key.arena != self.id {
            return None;
        }
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
    }

    pub(crate) fn get(&self, key: Key<T>) -> Option<&T> {
        if key.arena != self.id {
            return None;
        }
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: Key<T>) -> Option<&mut T> {
        self.slot_mut(key).and_then(|slot| slot.value.as_mut())
    }

    pub(crate) fn contains(&self, key: Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// Remove a value and invalidate every key issued for its slot.
    pub(crate) fn free(&mut self, key: Key<T>) -> Option<T> {
        let slot = self.slot_mut(key)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
