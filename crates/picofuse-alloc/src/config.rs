//! Pool configuration parameters.

use crate::error::AllocError;

/// Configuration for the block pool.
///
/// Controls the byte budget, block limit, and whether allocation sites are
/// recorded. Validated at construction; all values are immutable after
/// creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Total bytes the pool may hand out, counting
    /// [`HEADER_OVERHEAD`](crate::HEADER_OVERHEAD) per block.
    ///
    /// Default: 262_144 (256KB, the RAM budget of the target board).
    pub capacity_bytes: usize,

    /// Maximum number of live blocks.
    ///
    /// Default: 4096. Must be at least 1 and at most
    /// [`MAX_BLOCKS_LIMIT`](Self::MAX_BLOCKS_LIMIT).
    pub max_blocks: u32,

    /// Record the caller location of every allocation.
    ///
    /// Costs one pointer per block. Default: on in debug builds.
    pub track_provenance: bool,
}

impl AllocatorConfig {
    /// Default byte budget: 256KB.
    pub const DEFAULT_CAPACITY_BYTES: usize = 256 * 1024;

    /// Default maximum live block count.
    pub const DEFAULT_MAX_BLOCKS: u32 = 4096;

    /// Largest block limit whose slot indices survive
    /// [`BlockRef::to_bits`](crate::BlockRef::to_bits) on this target.
    ///
    /// Handles pack into 16 index bits on 32-bit targets.
    pub const MAX_BLOCKS_LIMIT: u32 = if usize::BITS >= 64 {
        u32::MAX
    } else {
        0xFFFF
    };

    /// Create a config with the given byte budget and defaults elsewhere.
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            capacity_bytes,
            max_blocks: Self::DEFAULT_MAX_BLOCKS,
            track_provenance: cfg!(debug_assertions),
        }
    }

    /// An effectively unbounded pool, for host-side tools and tests.
    pub fn unbounded() -> Self {
        Self {
            capacity_bytes: usize::MAX,
            max_blocks: Self::MAX_BLOCKS_LIMIT,
            track_provenance: cfg!(debug_assertions),
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.max_blocks == 0 {
            return Err(AllocError::InvalidConfig {
                reason: "max_blocks must be at least 1".to_string(),
            });
        }
        if self.max_blocks > Self::MAX_BLOCKS_LIMIT {
            return Err(AllocError::InvalidConfig {
                reason: format!(
                    "max_blocks ({}) exceeds the addressable limit ({})",
                    self.max_blocks,
                    Self::MAX_BLOCKS_LIMIT,
                ),
            });
        }
        if self.capacity_bytes < crate::HEADER_OVERHEAD {
            return Err(AllocError::InvalidConfig {
                reason: format!(
                    "capacity_bytes ({}) cannot hold a single block header ({} bytes)",
                    self.capacity_bytes,
                    crate::HEADER_OVERHEAD,
                ),
            });
        }
        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY_BYTES)
    }
}
