//! Pool error types.

use picofuse_core::Tag;

use crate::handle::BlockRef;

/// Errors that can occur during pool operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// The byte budget or block limit would be exceeded.
    #[error("pool exhausted: requested {requested} bytes for tag {tag}, {available} bytes available")]
    Exhausted {
        /// Bytes requested, including the block header.
        requested: usize,
        /// Bytes still available in the budget.
        available: usize,
        /// Tag of the value being allocated.
        tag: Tag,
    },
    /// A handle whose block has been freed (or never existed).
    #[error("stale handle {handle}")]
    StaleHandle {
        /// The offending handle.
        handle: BlockRef,
    },
    /// `retain` on a block whose count is already at the maximum.
    #[error("reference count overflow on {handle}")]
    RefCountOverflow {
        /// The offending handle.
        handle: BlockRef,
    },
    /// `release` on a block whose count is already zero.
    #[error("over-release of {handle}: reference count is already zero")]
    OverRelease {
        /// The offending handle.
        handle: BlockRef,
    },
    /// Configuration failed validation.
    #[error("invalid pool config: {reason}")]
    InvalidConfig {
        /// Which invariant was violated.
        reason: String,
    },
}
