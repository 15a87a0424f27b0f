//! The application: owner of the pool, the type registry and both cores'
//! event machinery.
//!
//! Lifecycle: [`Application::new`] (or [`with_config`](Application::with_config)),
//! then [`run`](Application::run) or manual dispatch, then exactly one
//! [`destroy`](Application::destroy), which reports leaks and yields the
//! process exit code.
//!
//! Reclamation is two-phase. [`release`](Application::release) only drops
//! a count; orphaned values stay resident until a
//! [`drain`](Application::drain) sweep runs their destructors and frees
//! their blocks. Destructors typically release children, which a later
//! sweep then reclaims, so teardown drains to a fixed point.

use crossbeam_channel::Select;
use picofuse_alloc::Pool;
use picofuse_core::{Core, EXIT_MEMORY_LEAKS, EXIT_SUCCESS};

use crate::builtin;
use crate::config::{AppConfig, DrainPolicy};
use crate::error::AppError;
use crate::event::{self, CoreState, EventPoster};
use crate::metrics::RuntimeMetrics;
use crate::types::Registry;
use crate::value::{Value, ValueRef};

/// A Picofuse application.
pub struct Application {
    pub(crate) pool: Pool<Value>,
    pub(crate) registry: Registry,
    pub(crate) cores: [CoreState; Core::COUNT],
    pub(crate) poster: EventPoster,
    pub(crate) metrics: RuntimeMetrics,
    exit_code: Option<i32>,
    config: AppConfig,
}

impl Application {
    /// An application with the default configuration.
    pub fn new() -> Result<Self, AppError> {
        Self::with_config(AppConfig::default())
    }

    /// Validate `config`, create the pool, register the built-in types and
    /// create both core queues.
    pub fn with_config(config: AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        let pool = Pool::new(config.allocator.clone())?;
        let mut registry = Registry::new();
        builtin::register_all(&mut registry);
        let (poster, [rx0, rx1]) = event::inboxes(config.inbox_capacity);

        // Queues need a live application to be allocated in; start with
        // placeholder handles and swap the real lists in below.
        let placeholder = ValueRef::from_bits(0);
        let mut app = Self {
            pool,
            registry,
            cores: [
                CoreState::new(placeholder, rx0),
                CoreState::new(placeholder, rx1),
            ],
            poster,
            metrics: RuntimeMetrics::default(),
            exit_code: None,
            config,
        };
        for core in Core::ALL {
            let queue = app.new_list()?;
            app.retain(queue);
            app.cores[core.index()].queue = queue;
        }
        tracing::debug!(
            capacity_bytes = app.config.allocator.capacity_bytes,
            max_blocks = app.config.allocator.max_blocks,
            "application created"
        );
        Ok(app)
    }

    /// The configuration this application was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ── reference counting ─────────────────────────────────────────

    /// Add a reference to `value` and return it.
    ///
    /// # Panics
    ///
    /// Panics if `value` is stale or its count is already at `u16::MAX`.
    pub fn retain(&mut self, value: ValueRef) -> ValueRef {
        if let Err(e) = self.pool.retain(value) {
            panic!("retain: {e}");
        }
        value
    }

    /// Drop a reference to `value`. Returns `true` if the count reached
    /// zero. Nothing is freed until the next drain.
    ///
    /// # Panics
    ///
    /// Panics if `value` is stale or its count is already zero.
    pub fn release(&mut self, value: ValueRef) -> bool {
        match self.pool.release(value) {
            Ok(orphaned) => orphaned,
            Err(e) => panic!("release: {e}"),
        }
    }

    // ── reclamation ────────────────────────────────────────────────

    /// One sweep over the live list, reclaiming every orphaned value.
    /// Returns the number reclaimed.
    pub fn drain(&mut self) -> usize {
        self.drain_bounded(usize::MAX)
    }

    /// One sweep that stops after reclaiming `max` values.
    pub fn drain_bounded(&mut self, max: usize) -> usize {
        let mut reclaimed = 0;
        let mut cursor = self.pool.head();
        while let Some(handle) = cursor {
            if reclaimed >= max {
                break;
            }
            if !self.pool.contains(handle) {
                // A destructor freed the block we were about to visit.
                cursor = self.pool.head();
                continue;
            }
            let next = self.pool.next(handle).ok().flatten();
            if self.pool.ref_count(handle) == Ok(0) && self.free_value(handle).is_ok() {
                reclaimed += 1;
            }
            cursor = next;
        }
        self.metrics.drain_sweeps += 1;
        self.metrics.blocks_drained += reclaimed as u64;
        if reclaimed > 0 {
            tracing::debug!(reclaimed, live = self.pool.len(), "drain");
        }
        reclaimed
    }

    /// Sweep until a pass reclaims nothing. Returns the total reclaimed.
    pub fn drain_all(&mut self) -> usize {
        let mut total = 0;
        loop {
            let n = self.drain();
            if n == 0 {
                return total;
            }
            total += n;
        }
    }

    // ── run loop ───────────────────────────────────────────────────

    /// Run `entry`, then dispatch events on both cores until exit is
    /// requested.
    ///
    /// A non-zero return from `entry` requests exit with that code and
    /// skips the loop. When an iteration dispatches nothing the loop
    /// blocks on the interrupt inboxes for up to
    /// [`AppConfig::idle_wait`].
    pub fn run<F>(&mut self, entry: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Application) -> i32,
    {
        let code = entry(self);
        if code != EXIT_SUCCESS {
            self.request_exit(code);
            return Ok(());
        }

        let mut iteration: u64 = 0;
        while !self.is_exit_requested() {
            let mut dispatched = 0;
            for core in Core::ALL {
                dispatched += self.dispatch(core)?;
            }
            iteration += 1;

            let sweep = match self.config.drain_policy {
                DrainPolicy::Teardown => false,
                DrainPolicy::AfterDispatch => dispatched > 0,
                DrainPolicy::Every(n) => iteration % n == 0,
            };
            if sweep {
                self.drain();
            }

            if dispatched == 0 && !self.is_exit_requested() {
                self.idle_wait();
            }
        }
        Ok(())
    }

    fn idle_wait(&self) {
        let mut sel = Select::new();
        for core in &self.cores {
            sel.recv(&core.inbox);
        }
        // Readiness is all we need; the next dispatch does the receiving.
        let _ = sel.ready_timeout(self.config.idle_wait);
    }

    /// Ask the run loop to stop. Exit code 0 means success.
    pub fn request_exit(&mut self, code: i32) {
        tracing::debug!(code, "exit requested");
        self.exit_code = Some(code);
    }

    /// Whether [`request_exit`](Self::request_exit) has been called.
    pub fn is_exit_requested(&self) -> bool {
        self.exit_code.is_some()
    }

    /// The requested exit code, if any.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    // ── teardown ───────────────────────────────────────────────────

    /// Tear the application down and return the process exit code.
    ///
    /// Releases both queues, drains to a fixed point and, with
    /// `leak_check` on, logs every block still live. Leaks turn a
    /// successful exit into [`EXIT_MEMORY_LEAKS`]; a user failure code
    /// is kept as is.
    pub fn destroy(mut self) -> i32 {
        for core in Core::ALL {
            let queue = self.cores[core.index()].queue;
            if self.pool.contains(queue) {
                self.release(queue);
            }
        }
        let drained = self.drain_all();

        let mut exit_code = self.exit_code.unwrap_or(EXIT_SUCCESS);
        if self.config.leak_check {
            let leaks = self.report_leaks();
            if leaks > 0 && exit_code == EXIT_SUCCESS {
                exit_code = EXIT_MEMORY_LEAKS;
            }
        }

        let discarded = self.pool.destroy();
        tracing::info!(exit_code, drained, discarded, "application destroyed");
        exit_code
    }

    fn report_leaks(&self) -> usize {
        let mut leaks = 0;
        for (handle, block) in self.pool.iter() {
            let header = block.header();
            let type_name = self.registry.name(header.tag());
            match header.provenance() {
                Some(at) => tracing::warn!(
                    %handle,
                    type_name,
                    size = header.size(),
                    refs = header.ref_count(),
                    allocated_at = %at,
                    "leak"
                ),
                None => tracing::warn!(
                    %handle,
                    type_name,
                    size = header.size(),
                    refs = header.ref_count(),
                    "leak"
                ),
            }
            leaks += 1;
        }
        leaks
    }

    // ── metrics ────────────────────────────────────────────────────

    /// Snapshot of pool usage and event counters.
    pub fn metrics(&self) -> RuntimeMetrics {
        RuntimeMetrics {
            pool: self.pool.stats().clone(),
            pending: Core::ALL.map(|core| self.pending_events(core)),
            ..self.metrics.clone()
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("live_values", &self.pool.len())
            .field("registry", &self.registry)
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}
