//! The block pool: headers, the live-block list, and reference counts.
//!
//! [`Pool`] stores blocks in a slot table indexed by [`BlockRef`]. Freed
//! slots go on a free list and are reused with a bumped generation, so a
//! stale handle can never alias a newer block. Live blocks are threaded
//! onto a doubly linked list through their headers (`prev`/`next` are slot
//! indices), giving allocation-ordered traversal in both directions.

use picofuse_core::Tag;

use crate::config::AllocatorConfig;
use crate::error::AllocError;
use crate::handle::{BlockRef, Provenance};
use crate::stats::PoolStats;

/// Bytes charged against the budget for every block, on top of its payload.
///
/// Matches the header footprint of the 32-bit target: payload pointer,
/// size, tag, count, flags, two links, and the provenance pointer.
pub const HEADER_OVERHEAD: usize = 32;

/// Fixed per-block bookkeeping.
#[derive(Clone, Debug)]
pub struct BlockHeader {
    tag: Tag,
    size: usize,
    refs: u16,
    prev: Option<u32>,
    next: Option<u32>,
    provenance: Option<Provenance>,
}

impl BlockHeader {
    /// Type tag recorded at allocation; immutable afterwards.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Payload size in bytes, excluding the header.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current reference count. Zero means orphaned.
    pub fn ref_count(&self) -> u16 {
        self.refs
    }

    /// Where the block was allocated, if provenance tracking is on.
    pub fn provenance(&self) -> Option<Provenance> {
        self.provenance
    }
}

/// A live block: header plus payload.
#[derive(Debug)]
pub struct Block<T> {
    header: BlockHeader,
    payload: T,
}

impl<T> Block<T> {
    /// The block header.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Shared access to the payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Mutable access to the payload.
    pub fn payload_mut(&mut self) -> &mut T {
        &mut self.payload
    }
}

/// A slot is in use exactly when `block` is `Some`.
struct Slot<T> {
    generation: u32,
    block: Option<Block<T>>,
}

/// Reference-counted block pool with a live-block list.
///
/// The pool never frees a block on its own: [`release`](Pool::release)
/// reports when a count reaches zero and the owner sweeps orphaned blocks
/// with [`free`](Pool::free) when it chooses.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Indices of vacant slots available for reuse.
    free_list: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    stats: PoolStats,
    config: AllocatorConfig,
}

impl<T> Pool<T> {
    /// Create an empty pool.
    pub fn new(config: AllocatorConfig) -> Result<Self, AllocError> {
        config.validate()?;
        Ok(Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            head: None,
            tail: None,
            stats: PoolStats::default(),
            config,
        })
    }

    /// Allocate a block holding `payload`, charged as `size` bytes.
    ///
    /// The block is linked at the tail of the live list with a reference
    /// count of zero. Returns [`AllocError::Exhausted`] when the byte
    /// budget or block limit would be exceeded; `payload` is dropped.
    pub fn allocate(
        &mut self,
        size: usize,
        tag: Tag,
        payload: T,
        provenance: Option<Provenance>,
    ) -> Result<BlockRef, AllocError> {
        let available = self.config.capacity_bytes.saturating_sub(self.stats.live_bytes);
        let requested = size.saturating_add(crate::HEADER_OVERHEAD);
        if requested > available || self.stats.live_blocks >= self.config.max_blocks {
            return Err(self.exhausted(requested, available, tag));
        }

        let index = match self.free_list.pop() {
            Some(index) => index,
            None => {
                let Ok(index) = u32::try_from(self.slots.len()) else {
                    return Err(self.exhausted(requested, available, tag));
                };
                if self.slots.try_reserve(1).is_err() {
                    return Err(self.exhausted(requested, available, tag));
                }
                self.slots.push(Slot {
                    generation: 0,
                    block: None,
                });
                index
            }
        };

        let header = BlockHeader {
            tag,
            size,
            refs: 0,
            prev: self.tail,
            next: None,
            provenance: if self.config.track_provenance {
                provenance
            } else {
                None
            },
        };

        // Link at the tail.
        match self.tail {
            Some(tail) => self.link_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);

        let slot = &mut self.slots[index as usize];
        slot.block = Some(Block { header, payload });
        self.stats.record_alloc(requested);
        Ok(BlockRef::new(index, slot.generation))
    }

    /// Unlink and free a block, returning its payload.
    ///
    /// The slot is recycled with a new generation; `handle` and every copy
    /// of it become stale.
    pub fn free(&mut self, handle: BlockRef) -> Result<T, AllocError> {
        self.check(handle)?;
        let index = handle.index;
        let slot = &mut self.slots[index as usize];
        let Some(block) = slot.block.take() else {
            return Err(AllocError::StaleHandle { handle });
        };
        slot.generation = slot.generation.wrapping_add(1);

        let BlockHeader { prev, next, .. } = block.header;
        match prev {
            Some(prev) => self.link_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.link_mut(next).prev = prev,
            None => self.tail = prev,
        }

        self.free_list.push(index);
        self.stats
            .record_free(block.header.size + crate::HEADER_OVERHEAD);
        Ok(block.payload)
    }

    /// Increment a block's reference count, returning the new count.
    ///
    /// Fails with [`AllocError::RefCountOverflow`] at `u16::MAX`.
    pub fn retain(&mut self, handle: BlockRef) -> Result<u16, AllocError> {
        let header = &mut self.get_mut(handle)?.header;
        header.refs = header
            .refs
            .checked_add(1)
            .ok_or(AllocError::RefCountOverflow { handle })?;
        Ok(header.refs)
    }

    /// Decrement a block's reference count.
    ///
    /// Returns `true` iff the count transitioned to zero. Does not free.
    pub fn release(&mut self, handle: BlockRef) -> Result<bool, AllocError> {
        let header = &mut self.get_mut(handle)?.header;
        header.refs = header
            .refs
            .checked_sub(1)
            .ok_or(AllocError::OverRelease { handle })?;
        Ok(header.refs == 0)
    }

    /// Whether `handle` names a live block.
    pub fn contains(&self, handle: BlockRef) -> bool {
        self.check(handle).is_ok()
    }

    /// Look up a live block.
    pub fn get(&self, handle: BlockRef) -> Result<&Block<T>, AllocError> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.block.as_ref())
            .ok_or(AllocError::StaleHandle { handle })
    }

    /// Look up a live block mutably.
    pub fn get_mut(&mut self, handle: BlockRef) -> Result<&mut Block<T>, AllocError> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.block.as_mut())
            .ok_or(AllocError::StaleHandle { handle })
    }

    /// Type tag of a live block.
    pub fn tag(&self, handle: BlockRef) -> Result<Tag, AllocError> {
        Ok(self.get(handle)?.header.tag)
    }

    /// Payload size of a live block.
    pub fn size(&self, handle: BlockRef) -> Result<usize, AllocError> {
        Ok(self.get(handle)?.header.size)
    }

    /// Reference count of a live block.
    pub fn ref_count(&self, handle: BlockRef) -> Result<u16, AllocError> {
        Ok(self.get(handle)?.header.refs)
    }

    /// First block on the live list (oldest allocation).
    pub fn head(&self) -> Option<BlockRef> {
        self.head.map(|i| self.handle_at(i))
    }

    /// Last block on the live list (newest allocation).
    pub fn tail(&self) -> Option<BlockRef> {
        self.tail.map(|i| self.handle_at(i))
    }

    /// The block after `handle` on the live list.
    pub fn next(&self, handle: BlockRef) -> Result<Option<BlockRef>, AllocError> {
        Ok(self.get(handle)?.header.next.map(|i| self.handle_at(i)))
    }

    /// The block before `handle` on the live list.
    pub fn prev(&self, handle: BlockRef) -> Result<Option<BlockRef>, AllocError> {
        Ok(self.get(handle)?.header.prev.map(|i| self.handle_at(i)))
    }

    /// Traverse the live list head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            pool: self,
            cursor: self.head,
            forward: true,
        }
    }

    /// Traverse the live list tail to head.
    pub fn iter_rev(&self) -> Iter<'_, T> {
        Iter {
            pool: self,
            cursor: self.tail,
            forward: false,
        }
    }

    /// Live blocks whose reference count is zero, head to tail.
    pub fn orphans(&self) -> impl Iterator<Item = BlockRef> + '_ {
        self.iter()
            .filter(|(_, block)| block.header.refs == 0)
            .map(|(handle, _)| handle)
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.stats.live_blocks as usize
    }

    /// Whether the pool holds no live blocks.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Usage counters.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Tear the pool down, discarding every remaining block.
    ///
    /// Returns the number of blocks that were still live. Callers that
    /// care about leaks drain and report before calling this.
    pub fn destroy(self) -> usize {
        let remaining = self.len();
        if remaining > 0 {
            tracing::debug!(remaining, "destroying pool with live blocks");
        }
        remaining
    }

    fn handle_at(&self, index: u32) -> BlockRef {
        BlockRef::new(index, self.slots[index as usize].generation)
    }

    fn check(&self, handle: BlockRef) -> Result<(), AllocError> {
        self.get(handle).map(|_| ())
    }

    /// Header of a slot known to be on the live list.
    fn link_mut(&mut self, index: u32) -> &mut BlockHeader {
        match self.slots[index as usize].block.as_mut() {
            Some(block) => &mut block.header,
            None => panic!("live list links to vacant slot {index}"),
        }
    }

    fn exhausted(&mut self, requested: usize, available: usize, tag: Tag) -> AllocError {
        self.stats.failed_allocations += 1;
        tracing::debug!(requested, available, %tag, "pool exhausted");
        AllocError::Exhausted {
            requested,
            available,
            tag,
        }
    }
}

/// Iterator over live blocks in list order.
pub struct Iter<'a, T> {
    pool: &'a Pool<T>,
    cursor: Option<u32>,
    forward: bool,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (BlockRef, &'a Block<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let pool = self.pool;
        let index = self.cursor?;
        let slot = &pool.slots[index as usize];
        let block = slot.block.as_ref()?;
        self.cursor = if self.forward {
            block.header.next
        } else {
            block.header.prev
        };
        Some((BlockRef::new(index, slot.generation), block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool<u32> {
        Pool::new(AllocatorConfig::new(4096)).unwrap()
    }

    fn handles_forward(pool: &Pool<u32>) -> Vec<BlockRef> {
        pool.iter().map(|(h, _)| h).collect()
    }

    #[test]
    fn allocate_links_at_tail() {
        let mut p = pool();
        let a = p.allocate(4, Tag::U32, 1, None).unwrap();
        let b = p.allocate(4, Tag::U32, 2, None).unwrap();
        let c = p.allocate(4, Tag::U32, 3, None).unwrap();
        assert_eq!(p.head(), Some(a));
        assert_eq!(p.tail(), Some(c));
        assert_eq!(handles_forward(&p), vec![a, b, c]);
        assert_eq!(p.next(a).unwrap(), Some(b));
        assert_eq!(p.prev(a).unwrap(), None);
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn new_block_has_zero_refs_and_recorded_header() {
        let mut p = pool();
        let a = p.allocate(8, Tag::F64, 7, None).unwrap();
        assert_eq!(p.ref_count(a).unwrap(), 0);
        assert_eq!(p.tag(a).unwrap(), Tag::F64);
        assert_eq!(p.size(a).unwrap(), 8);
        assert_eq!(*p.get(a).unwrap().payload(), 7);
    }

    #[test]
    fn free_middle_relinks_neighbours() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        let b = p.allocate(1, Tag::U8, 2, None).unwrap();
        let c = p.allocate(1, Tag::U8, 3, None).unwrap();
        assert_eq!(p.free(b).unwrap(), 2);
        assert_eq!(handles_forward(&p), vec![a, c]);
        assert_eq!(p.next(a).unwrap(), Some(c));
        assert_eq!(p.prev(c).unwrap(), Some(a));
    }

    #[test]
    fn free_head_and_tail_update_brackets() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        let b = p.allocate(1, Tag::U8, 2, None).unwrap();
        let c = p.allocate(1, Tag::U8, 3, None).unwrap();
        p.free(a).unwrap();
        assert_eq!(p.head(), Some(b));
        p.free(c).unwrap();
        assert_eq!(p.tail(), Some(b));
        p.free(b).unwrap();
        assert!(p.is_empty());
        assert_eq!(p.head(), None);
        assert_eq!(p.tail(), None);
    }

    #[test]
    fn freed_handle_is_stale_after_slot_reuse() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        p.free(a).unwrap();
        let b = p.allocate(1, Tag::U8, 2, None).unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert_eq!(p.get(a).err(), Some(AllocError::StaleHandle { handle: a }));
        assert_eq!(*p.get(b).unwrap().payload(), 2);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        p.free(a).unwrap();
        assert!(matches!(p.free(a), Err(AllocError::StaleHandle { .. })));
    }

    #[test]
    fn retain_release_transitions() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        assert_eq!(p.retain(a).unwrap(), 1);
        assert_eq!(p.retain(a).unwrap(), 2);
        // count 2: retain then release does not reach zero
        p.retain(a).unwrap();
        assert!(!p.release(a).unwrap());
        assert!(!p.release(a).unwrap());
        // count 1: release reaches zero
        assert!(p.release(a).unwrap());
        // release never frees
        assert!(p.contains(a));
    }

    #[test]
    fn over_release_is_an_error() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        assert_eq!(p.release(a), Err(AllocError::OverRelease { handle: a }));
    }

    #[test]
    fn retain_saturates_at_u16_max() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        for _ in 0..u16::MAX {
            p.retain(a).unwrap();
        }
        assert_eq!(p.retain(a), Err(AllocError::RefCountOverflow { handle: a }));
        assert_eq!(p.ref_count(a).unwrap(), u16::MAX);
    }

    #[test]
    fn byte_budget_exhaustion_is_reported() {
        let mut p: Pool<u32> = Pool::new(AllocatorConfig::new(2 * HEADER_OVERHEAD + 10)).unwrap();
        p.allocate(10, Tag::DATA, 0, None).unwrap();
        let err = p.allocate(1, Tag::DATA, 0, None).unwrap_err();
        assert!(matches!(err, AllocError::Exhausted { tag: Tag::DATA, .. }));
        assert_eq!(p.stats().failed_allocations, 1);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn block_limit_exhaustion_is_reported() {
        let config = AllocatorConfig {
            max_blocks: 2,
            ..AllocatorConfig::default()
        };
        let mut p: Pool<u32> = Pool::new(config).unwrap();
        p.allocate(0, Tag::NULL, 0, None).unwrap();
        p.allocate(0, Tag::NULL, 0, None).unwrap();
        assert!(matches!(
            p.allocate(0, Tag::NULL, 0, None),
            Err(AllocError::Exhausted { .. })
        ));
    }

    #[test]
    fn stats_track_usage_and_peaks() {
        let mut p = pool();
        let a = p.allocate(10, Tag::DATA, 0, None).unwrap();
        let _b = p.allocate(20, Tag::DATA, 0, None).unwrap();
        p.free(a).unwrap();
        let s = p.stats();
        assert_eq!(s.live_blocks, 1);
        assert_eq!(s.live_bytes, 20 + HEADER_OVERHEAD);
        assert_eq!(s.peak_bytes, 30 + 2 * HEADER_OVERHEAD);
        assert_eq!(s.allocations, 2);
        assert_eq!(s.frees, 1);
    }

    #[test]
    fn orphans_lists_zero_count_blocks_in_order() {
        let mut p = pool();
        let a = p.allocate(1, Tag::U8, 1, None).unwrap();
        let b = p.allocate(1, Tag::U8, 2, None).unwrap();
        let c = p.allocate(1, Tag::U8, 3, None).unwrap();
        p.retain(b).unwrap();
        assert_eq!(p.orphans().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn provenance_recorded_when_enabled() {
        let config = AllocatorConfig {
            track_provenance: true,
            ..AllocatorConfig::default()
        };
        let mut p: Pool<u32> = Pool::new(config).unwrap();
        let here = std::panic::Location::caller();
        let a = p.allocate(1, Tag::U8, 0, Some(here)).unwrap();
        assert_eq!(p.get(a).unwrap().header().provenance(), Some(here));
    }

    #[test]
    fn provenance_dropped_when_disabled() {
        let config = AllocatorConfig {
            track_provenance: false,
            ..AllocatorConfig::default()
        };
        let mut p: Pool<u32> = Pool::new(config).unwrap();
        let a = p
            .allocate(1, Tag::U8, 0, Some(std::panic::Location::caller()))
            .unwrap();
        assert_eq!(p.get(a).unwrap().header().provenance(), None);
    }

    #[test]
    fn destroy_reports_remaining_blocks() {
        let mut p = pool();
        p.allocate(1, Tag::U8, 1, None).unwrap();
        p.allocate(1, Tag::U8, 2, None).unwrap();
        assert_eq!(p.destroy(), 2);
    }
}
