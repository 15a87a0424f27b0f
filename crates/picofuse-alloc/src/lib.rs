//! Reference-counted block pool for the Picofuse runtime.
//!
//! Every object the runtime hands out lives in a [`Pool`] block. A block
//! carries a fixed header (type tag, payload size, reference count,
//! provenance) and sits on a doubly linked live-block list, so a teardown
//! sweep can visit every outstanding allocation in allocation order.
//!
//! # Architecture
//!
//! ```text
//! Pool<T>
//! ├── Slot[] (index + generation, recycled through a free list)
//! │   └── Block<T> { header, payload: T }
//! ├── head / tail (live-block list, linked through header prev/next)
//! └── PoolStats (running and high-water usage)
//! ```
//!
//! # Reclamation
//!
//! [`Pool::release`] only reports that a count reached zero; it never
//! frees. The owner decides when to sweep orphaned blocks (see
//! [`Pool::orphans`]), which batches teardown work into one pass.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handle;
pub mod pool;
pub mod stats;

pub use config::AllocatorConfig;
pub use error::AllocError;
pub use handle::{BlockRef, Provenance};
pub use pool::{Block, BlockHeader, Pool, HEADER_OVERHEAD};
pub use stats::PoolStats;
