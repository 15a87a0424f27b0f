//! Block handles and allocation provenance.
//!
//! A [`BlockRef`] names a block by slot index. It is generation-scoped: the
//! `generation` field allows O(1) staleness checks when a slot has been
//! freed and reused.

use std::fmt;
use std::panic::Location;

/// Source location of the call that allocated a block.
pub type Provenance = &'static Location<'static>;

/// Handle to a block in a [`Pool`](crate::Pool).
///
/// Handles are plain copyable values; holding one does not keep the block
/// alive. Use `retain`/`release` for that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef {
    /// Slot index within the pool.
    pub(crate) index: u32,
    /// Slot generation when this block was allocated.
    pub(crate) generation: u32,
}

impl BlockRef {
    /// Create a new handle.
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The slot generation this handle belongs to.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack the handle into a pointer-sized integer.
    ///
    /// Useful when a handle has to travel through an opaque payload slot
    /// such as a map value. On 32-bit targets both fields are packed into
    /// 16 bits; the index always fits because `AllocatorConfig::validate`
    /// caps `max_blocks` at `MAX_BLOCKS_LIMIT`, while the generation is
    /// truncated.
    pub fn to_bits(self) -> usize {
        if usize::BITS >= 64 {
            ((self.generation as u64) << 32 | self.index as u64) as usize
        } else {
            debug_assert!(self.index <= 0xFFFF, "slot index exceeds 16 bits");
            ((self.generation & 0xFFFF) as usize) << 16 | (self.index & 0xFFFF) as usize
        }
    }

    /// Inverse of [`to_bits`](Self::to_bits).
    pub fn from_bits(bits: usize) -> Self {
        if usize::BITS >= 64 {
            let bits = bits as u64;
            Self::new(bits as u32, (bits >> 32) as u32)
        } else {
            Self::new((bits & 0xFFFF) as u32, (bits >> 16) as u32)
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block(idx={}, gen={})", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let h = BlockRef::new(7, 3);
        assert_eq!(h.index(), 7);
        assert_eq!(h.generation(), 3);
        assert_eq!(h.to_string(), "Block(idx=7, gen=3)");
    }

    #[test]
    fn bits_round_trip() {
        let h = BlockRef::new(1234, 56);
        assert_eq!(BlockRef::from_bits(h.to_bits()), h);
    }
}
