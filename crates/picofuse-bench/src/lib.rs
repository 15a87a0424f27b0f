//! Benchmark profiles for the Picofuse runtime.
//!
//! - [`bench_config`]: an unbounded pool with leak checking off, so
//!   teardown cost is not part of the measurement.
//! - [`populated_app`]: an application holding a list of `n` retained
//!   values.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use picofuse_alloc::AllocatorConfig;
use picofuse_runtime::{AppConfig, AppError, Application, ValueRef};

/// Configuration shared by every benchmark.
pub fn bench_config() -> AppConfig {
    AppConfig {
        allocator: AllocatorConfig::unbounded(),
        leak_check: false,
        ..AppConfig::default()
    }
}

/// An application with one list of `n` u32 values. Returns the list.
pub fn populated_app(n: u32) -> Result<(Application, ValueRef), AppError> {
    let mut app = Application::with_config(bench_config())?;
    let list = app.new_list()?;
    app.retain(list);
    for i in 0..n {
        let v = app.new_u32(i)?;
        app.push_back(list, v)?;
    }
    Ok((app, list))
}
