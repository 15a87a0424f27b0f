//! Fixed-capacity open-addressing maps.
//!
//! [`FixedMap`] stores opaque `usize` keys and values with linear probing.
//! Deletion leaves a tombstone so later probes still reach keys placed
//! past it; an insert reuses the first tombstone on its probe path. The
//! table is sized once, at construction, and never grows. When an insert
//! takes the last vacant slot the table is rehashed in place, which clears
//! every tombstone.

use picofuse_alloc::AllocError;
use picofuse_core::Tag;

use crate::app::Application;
use crate::error::{MapError, ValueError};
use crate::value::{Body, InitArgs, ValueRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Vacant,
    Tombstone,
    Occupied { key: usize, value: usize },
}

/// Open-addressing table with a declared capacity.
///
/// Invariant: `occupancy <= capacity`, and at least one slot is vacant
/// whenever `capacity > 0`.
#[derive(Clone, Debug)]
pub struct FixedMap {
    slots: Box<[Slot]>,
    occupancy: usize,
    vacant: usize,
    capacity: usize,
}

enum Probe {
    Found(usize),
    Absent { insert_at: Option<usize> },
}

impl FixedMap {
    /// A map that holds at most `capacity` keys.
    ///
    /// Fails with [`AllocError::Exhausted`] when the table for `capacity`
    /// cannot be built on this host.
    pub fn new(capacity: usize) -> Result<Self, AllocError> {
        let exhausted = || AllocError::Exhausted {
            requested: Self::table_bytes(capacity),
            available: 0,
            tag: Tag::MAP,
        };
        let len = Self::table_len(capacity).ok_or_else(exhausted)?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(|_| exhausted())?;
        slots.resize(len, Slot::Vacant);
        Ok(Self {
            slots: slots.into_boxed_slice(),
            occupancy: 0,
            vacant: len,
            capacity,
        })
    }

    /// Slots allocated for a declared capacity: at least twice the
    /// capacity, rounded up to a power of two.
    fn table_len(capacity: usize) -> Option<usize> {
        capacity.checked_mul(2)?.max(1).checked_next_power_of_two()
    }

    /// Bytes a map of this capacity charges against the pool.
    ///
    /// Saturates at `usize::MAX` for capacities no table can hold, so the
    /// pool rejects them as exhausted.
    pub fn table_bytes(capacity: usize) -> usize {
        Self::table_len(capacity)
            .and_then(|len| len.checked_mul(std::mem::size_of::<Slot>()))
            .unwrap_or(usize::MAX)
    }

    fn home(&self, key: usize) -> usize {
        // Fibonacci hashing; the table length is a power of two.
        let h = (key as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (h >> 32) as usize & (self.slots.len() - 1)
    }

    fn probe(&self, key: usize) -> Probe {
        let mask = self.slots.len() - 1;
        let mut i = self.home(key);
        let mut tombstone = None;
        for _ in 0..self.slots.len() {
            match self.slots[i] {
                Slot::Occupied { key: k, .. } if k == key => return Probe::Found(i),
                Slot::Occupied { .. } => {}
                Slot::Tombstone => {
                    tombstone.get_or_insert(i);
                }
                Slot::Vacant => {
                    return Probe::Absent {
                        insert_at: tombstone.or(Some(i)),
                    }
                }
            }
            i = (i + 1) & mask;
        }
        Probe::Absent {
            insert_at: tombstone,
        }
    }

    /// Insert, overwrite or (with `None`) delete `key`.
    ///
    /// A new key beyond the declared capacity fails with
    /// [`MapError::Full`] and leaves the table untouched. Deleting an
    /// absent key is a no-op.
    pub fn set(&mut self, key: usize, value: Option<usize>) -> Result<(), MapError> {
        match (self.probe(key), value) {
            (Probe::Found(i), Some(value)) => {
                self.slots[i] = Slot::Occupied { key, value };
            }
            (Probe::Found(i), None) => {
                self.slots[i] = Slot::Tombstone;
                self.occupancy -= 1;
            }
            (Probe::Absent { .. }, None) => {}
            (Probe::Absent { insert_at }, Some(value)) => {
                let i = match insert_at {
                    Some(i) if self.occupancy < self.capacity => i,
                    _ => {
                        return Err(MapError::Full {
                            capacity: self.capacity,
                        })
                    }
                };
                if self.slots[i] == Slot::Vacant {
                    self.vacant -= 1;
                }
                self.slots[i] = Slot::Occupied { key, value };
                self.occupancy += 1;
                if self.vacant == 0 {
                    self.rehash();
                }
            }
        }
        Ok(())
    }

    /// Reinsert every live key into a tombstone-free table of the same
    /// length.
    fn rehash(&mut self) {
        let live: Vec<(usize, usize)> = self.iter().collect();
        self.slots.fill(Slot::Vacant);
        self.vacant = self.slots.len();
        let mask = self.slots.len() - 1;
        for (key, value) in live {
            let mut i = self.home(key);
            while self.slots[i] != Slot::Vacant {
                i = (i + 1) & mask;
            }
            self.slots[i] = Slot::Occupied { key, value };
            self.vacant -= 1;
        }
        tracing::trace!(occupancy = self.occupancy, "map rehashed");
    }

    /// The value stored under `key`.
    pub fn get(&self, key: usize) -> Option<usize> {
        match self.probe(key) {
            Probe::Found(i) => match self.slots[i] {
                Slot::Occupied { value, .. } => Some(value),
                _ => None,
            },
            Probe::Absent { .. } => None,
        }
    }

    /// `(occupancy, capacity)`.
    pub fn stats(&self) -> (usize, usize) {
        (self.occupancy, self.capacity)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.occupancy
    }

    /// Whether no key is live.
    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// Declared capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots.iter().filter_map(|slot| match *slot {
            Slot::Occupied { key, value } => Some((key, value)),
            _ => None,
        })
    }
}

impl Application {
    /// A `Tag::MAP` value holding at most `capacity` keys.
    #[track_caller]
    pub fn new_map(&mut self, capacity: usize) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::MAP, InitArgs::Capacity(capacity))
    }

    fn fixed_map(&self, map: ValueRef) -> Result<&FixedMap, ValueError> {
        match self.body(map)? {
            Body::Map(m) => Ok(m),
            _ => Err(self.wrong_type(map, "map")),
        }
    }

    /// [`FixedMap::set`] on a map value.
    pub fn map_set(
        &mut self,
        map: ValueRef,
        key: usize,
        value: Option<usize>,
    ) -> Result<(), MapError> {
        self.fixed_map(map)?;
        match self.body_mut(map)? {
            Body::Map(m) => m.set(key, value),
            _ => unreachable!("checked above"),
        }
    }

    /// [`FixedMap::get`] on a map value.
    pub fn map_get(&self, map: ValueRef, key: usize) -> Result<Option<usize>, MapError> {
        Ok(self.fixed_map(map)?.get(key))
    }

    /// [`FixedMap::stats`] on a map value.
    pub fn map_stats(&self, map: ValueRef) -> Result<(usize, usize), MapError> {
        Ok(self.fixed_map(map)?.stats())
    }
}
