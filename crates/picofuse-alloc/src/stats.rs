//! Running and high-water usage counters for a pool.

/// Usage counters maintained by a [`Pool`](crate::Pool).
///
/// Byte counts include [`HEADER_OVERHEAD`](crate::HEADER_OVERHEAD) per
/// block, so `live_bytes` is what the pool charges against its budget.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Blocks currently on the live list.
    pub live_blocks: u32,
    /// Bytes currently charged against the budget.
    pub live_bytes: usize,
    /// Highest `live_blocks` ever observed.
    pub peak_blocks: u32,
    /// Highest `live_bytes` ever observed.
    pub peak_bytes: usize,
    /// Cumulative successful allocations.
    pub allocations: u64,
    /// Cumulative frees.
    pub frees: u64,
    /// Cumulative allocations rejected for exhaustion.
    pub failed_allocations: u64,
}

impl PoolStats {
    pub(crate) fn record_alloc(&mut self, bytes: usize) {
        self.live_blocks += 1;
        self.live_bytes += bytes;
        self.allocations += 1;
        self.peak_blocks = self.peak_blocks.max(self.live_blocks);
        self.peak_bytes = self.peak_bytes.max(self.live_bytes);
    }

    pub(crate) fn record_free(&mut self, bytes: usize) {
        self.live_blocks -= 1;
        self.live_bytes -= bytes;
        self.frees += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = PoolStats::default();
        assert_eq!(s.live_blocks, 0);
        assert_eq!(s.live_bytes, 0);
        assert_eq!(s.peak_blocks, 0);
        assert_eq!(s.peak_bytes, 0);
        assert_eq!(s.allocations, 0);
        assert_eq!(s.frees, 0);
        assert_eq!(s.failed_allocations, 0);
    }

    #[test]
    fn peaks_survive_frees() {
        let mut s = PoolStats::default();
        s.record_alloc(100);
        s.record_alloc(50);
        s.record_free(100);
        assert_eq!(s.live_blocks, 1);
        assert_eq!(s.live_bytes, 50);
        assert_eq!(s.peak_blocks, 2);
        assert_eq!(s.peak_bytes, 150);
        assert_eq!(s.allocations, 2);
        assert_eq!(s.frees, 1);
    }
}
