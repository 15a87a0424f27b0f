//! Value system, containers, event dispatch and application lifecycle.
//!
//! An [`Application`] owns one block [`Pool`](picofuse_alloc::Pool), a
//! registry of [`ValueType`] descriptors, and one event queue plus callback
//! table per physical [`Core`](picofuse_core::Core). Everything a driver
//! creates is a pool value addressed by a [`ValueRef`]; values are shared by
//! reference count and reclaimed in explicit [`drain`](Application::drain)
//! sweeps rather than at the moment their count reaches zero.
//!
//! ```text
//! Application
//! ├── Pool<Value> (live-block list, budget, stats)
//! ├── Registry (Tag → Arc<dyn ValueType>)
//! ├── CoreState × 2
//! │   ├── queue: LIST value of pending EVENT values
//! │   ├── callbacks: one slot per EventType
//! │   └── inbox: bounded channel fed by EventPoster (interrupt side)
//! └── exit code, config, counters
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod app;
pub mod builtin;
pub mod config;
pub mod error;
pub mod event;
pub mod list;
pub mod map;
pub mod metrics;
mod render;
pub mod types;
pub mod value;

pub use app::Application;
pub use config::{AppConfig, ConfigError, DrainPolicy};
pub use error::{AppError, EventError, ListError, MapError, ValueError};
pub use event::{Callback, Event, EventPoster};
pub use list::{Container, ListIter};
pub use map::FixedMap;
pub use metrics::RuntimeMetrics;
pub use types::{Registry, ValueType};
pub use value::{Body, InitArgs, Links, Scalar, Value, ValueRef};
