//! Mock collaborators and fixtures for Picofuse development.
//!
//! The drivers in [`drivers`] implement [`ValueType`](picofuse_runtime::ValueType)
//! the way real peripheral drivers do (lazy registration, child values,
//! constructor failure with cleanup) without touching hardware.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod drivers;

use std::time::Duration;

use picofuse_alloc::AllocatorConfig;
use picofuse_runtime::{AppConfig, Application};

pub use drivers::{
    new_adc, new_failing, new_gpio, AdcConfig, AdcType, FailingType, GpioConfig, GpioMode,
    GpioState, GpioType, ADC_TEMP_CHANNEL,
};

/// Config for tests: leak checking on, an unbounded pool, provenance on,
/// and a short idle wait so run loops do not stall a test.
pub fn test_config() -> AppConfig {
    AppConfig {
        allocator: AllocatorConfig {
            track_provenance: true,
            ..AllocatorConfig::unbounded()
        },
        leak_check: true,
        idle_wait: Duration::from_millis(1),
        ..AppConfig::default()
    }
}

/// An application built from [`test_config`].
pub fn test_app() -> Application {
    Application::with_config(test_config()).expect("test config is valid")
}
