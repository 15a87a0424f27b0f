//! Application configuration and validation.
//!
//! [`AppConfig`] is the builder input for [`Application`](crate::Application).
//! [`validate()`](AppConfig::validate) checks structural invariants at
//! startup; the config is immutable once the application is built.

use std::time::Duration;

use picofuse_alloc::{AllocError, AllocatorConfig};

// ── DrainPolicy ────────────────────────────────────────────────────

/// When the run loop sweeps orphaned values.
///
/// Reclamation is always explicit: a value whose count reaches zero stays
/// resident until a drain pass. The policy only decides whether
/// [`run`](crate::Application::run) performs such passes on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Only at [`destroy`](crate::Application::destroy), or when the
    /// application calls `drain` itself.
    #[default]
    Teardown,
    /// After every loop iteration that dispatched at least one event.
    AfterDispatch,
    /// Every `n` loop iterations. `n` must be non-zero.
    Every(u64),
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`AppConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Allocator configuration is invalid.
    #[error("allocator: {0}")]
    Allocator(#[from] AllocError),
    /// Interrupt inbox capacity is zero.
    #[error("inbox_capacity must be at least 1")]
    InboxZero,
    /// `DrainPolicy::Every(0)`.
    #[error("drain interval must be at least 1 iteration")]
    DrainIntervalZero,
}

// ── AppConfig ──────────────────────────────────────────────────────

/// Complete configuration for an [`Application`](crate::Application).
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Pool budget and provenance tracking.
    pub allocator: AllocatorConfig,
    /// Report blocks still live at teardown. Default: on in debug builds.
    pub leak_check: bool,
    /// Automatic drain behaviour of the run loop. Default: `Teardown`.
    pub drain_policy: DrainPolicy,
    /// How long the run loop blocks on the interrupt inboxes when an
    /// iteration dispatched nothing. Default: 100 ms.
    pub idle_wait: Duration,
    /// Per-core bound on pending interrupt-side posts. Default: 64.
    pub inbox_capacity: usize,
}

impl AppConfig {
    /// Default idle wait between empty loop iterations.
    pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(100);
    /// Default per-core inbox bound.
    pub const DEFAULT_INBOX_CAPACITY: usize = 64;

    /// Check every structural invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.allocator.validate()?;
        if self.inbox_capacity == 0 {
            return Err(ConfigError::InboxZero);
        }
        if self.drain_policy == DrainPolicy::Every(0) {
            return Err(ConfigError::DrainIntervalZero);
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            allocator: AllocatorConfig::default(),
            leak_check: cfg!(debug_assertions),
            drain_policy: DrainPolicy::default(),
            idle_wait: Self::DEFAULT_IDLE_WAIT,
            inbox_capacity: Self::DEFAULT_INBOX_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.drain_policy, DrainPolicy::Teardown);
        assert_eq!(cfg.idle_wait, Duration::from_millis(100));
        assert_eq!(cfg.leak_check, cfg!(debug_assertions));
    }

    #[test]
    fn zero_inbox_rejected() {
        let cfg = AppConfig {
            inbox_capacity: 0,
            ..AppConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InboxZero));
    }

    #[test]
    fn zero_drain_interval_rejected() {
        let cfg = AppConfig {
            drain_policy: DrainPolicy::Every(0),
            ..AppConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::DrainIntervalZero));
    }

    #[test]
    fn allocator_errors_are_wrapped() {
        let cfg = AppConfig {
            allocator: AllocatorConfig {
                max_blocks: 0,
                ..AllocatorConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Allocator(_))));
    }
}
