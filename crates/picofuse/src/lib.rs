//! Picofuse: an application runtime for dual-core microcontrollers.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Picofuse sub-crates. For most users, adding `picofuse` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use picofuse::prelude::*;
//!
//! let mut app = Application::new().unwrap();
//!
//! // A source value and a callback for GPIO events on core 0.
//! let button = app.new_str("button").unwrap();
//! app.register_callback(EventType::Gpio, Core::Zero, |app, event, payload| {
//!     let source = app.event_source(event).unwrap();
//!     assert_eq!(app.render(source, false).unwrap(), "button");
//!     app.request_exit(payload as i32);
//! });
//!
//! // Post from interrupt context; the run loop picks it up.
//! app.poster().post(Core::Zero, button, EventType::Gpio, 0).unwrap();
//! app.run(|_| 0).unwrap();
//!
//! assert_eq!(app.destroy(), EXIT_SUCCESS);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `picofuse-core` | Tags, cores, event types, exit codes |
//! | [`alloc`] | `picofuse-alloc` | Block pool, handles, pool config and stats |
//! | [`runtime`] | `picofuse-runtime` | Values, containers, events, `Application` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers (`picofuse-core`).
pub use picofuse_core as types;

/// The block pool (`picofuse-alloc`).
///
/// Applications rarely use the pool directly; [`alloc::AllocatorConfig`]
/// is the part most code touches, through
/// [`AppConfig::allocator`](runtime::AppConfig::allocator).
pub use picofuse_alloc as alloc;

/// Values, containers, events and the application (`picofuse-runtime`).
pub use picofuse_runtime as runtime;

/// Common imports for Picofuse applications and drivers.
///
/// ```rust
/// use picofuse::prelude::*;
/// ```
pub mod prelude {
    pub use picofuse_alloc::AllocatorConfig;
    pub use picofuse_core::{Core, EventType, Tag, EXIT_MEMORY_LEAKS, EXIT_SUCCESS};
    pub use picofuse_runtime::{
        AppConfig, AppError, Application, Body, DrainPolicy, EventError, EventPoster, InitArgs,
        ListError, MapError, ValueError, ValueRef, ValueType,
    };
}
