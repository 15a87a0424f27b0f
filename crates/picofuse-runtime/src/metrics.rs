//! Runtime counters for telemetry and tests.
//!
//! [`RuntimeMetrics`] is a snapshot: the application keeps the cumulative
//! counters and fills in the pool statistics and queue depths when
//! [`metrics()`](crate::Application::metrics) is called.

use picofuse_alloc::PoolStats;
use picofuse_core::Core;

/// Point-in-time view of pool usage and event traffic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuntimeMetrics {
    /// Allocator usage counters.
    pub pool: PoolStats,
    /// Events currently queued, per core.
    pub pending: [usize; Core::COUNT],
    /// Cumulative events appended to a queue.
    pub events_posted: u64,
    /// Cumulative events consumed by `dispatch`.
    pub events_dispatched: u64,
    /// Cumulative interrupt-side posts dropped at ingest (stale source or
    /// pool exhaustion).
    pub events_dropped: u64,
    /// Cumulative callback invocations.
    pub callbacks_invoked: u64,
    /// Cumulative drain sweeps.
    pub drain_sweeps: u64,
    /// Cumulative values reclaimed by drain sweeps.
    pub blocks_drained: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = RuntimeMetrics::default();
        assert_eq!(m.pool, PoolStats::default());
        assert_eq!(m.pending, [0, 0]);
        assert_eq!(m.events_posted, 0);
        assert_eq!(m.events_dispatched, 0);
        assert_eq!(m.events_dropped, 0);
        assert_eq!(m.callbacks_invoked, 0);
        assert_eq!(m.drain_sweeps, 0);
        assert_eq!(m.blocks_drained, 0);
    }
}
