//! Core identifiers for the Picofuse runtime.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! small vocabulary every other Picofuse crate speaks: type tags, physical
//! cores, event classifications, and process exit codes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;

pub use error::IdError;
pub use id::{Core, EventType, Tag, EXIT_MEMORY_LEAKS, EXIT_SUCCESS};
