//! Live-block list invariants under arbitrary allocate/free sequences.

use std::collections::BTreeSet;

use picofuse_alloc::{AllocatorConfig, BlockRef, Pool};
use picofuse_core::Tag;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Alloc(usize),
    /// Free the n-th live block (modulo the live count).
    Free(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..64).prop_map(Op::Alloc),
        any::<usize>().prop_map(Op::Free),
    ]
}

fn run(ops: &[Op]) -> (Pool<usize>, Vec<BlockRef>) {
    let mut pool = Pool::new(AllocatorConfig::unbounded()).unwrap();
    let mut live: Vec<BlockRef> = Vec::new();
    for (i, op) in ops.iter().enumerate() {
        match op {
            Op::Alloc(size) => live.push(pool.allocate(*size, Tag::DATA, i, None).unwrap()),
            Op::Free(n) if !live.is_empty() => {
                let victim = live.remove(n % live.len());
                pool.free(victim).unwrap();
            }
            Op::Free(_) => {}
        }
    }
    (pool, live)
}

proptest! {
    #[test]
    fn forward_and_reverse_traversal_agree(ops in prop::collection::vec(arb_op(), 0..128)) {
        let (pool, live) = run(&ops);

        let forward: Vec<BlockRef> = pool.iter().map(|(h, _)| h).collect();
        let mut reverse: Vec<BlockRef> = pool.iter_rev().map(|(h, _)| h).collect();
        reverse.reverse();
        prop_assert_eq!(&forward, &reverse);

        // The list brackets exactly the live set, in allocation order.
        prop_assert_eq!(&forward, &live);
        prop_assert_eq!(pool.head(), live.first().copied());
        prop_assert_eq!(pool.tail(), live.last().copied());
        prop_assert_eq!(pool.len(), live.len());
    }

    #[test]
    fn live_bytes_match_sum_of_live_sizes(ops in prop::collection::vec(arb_op(), 0..128)) {
        let (pool, live) = run(&ops);
        let expected: usize = live
            .iter()
            .map(|h| pool.size(*h).unwrap() + picofuse_alloc::HEADER_OVERHEAD)
            .sum();
        prop_assert_eq!(pool.stats().live_bytes, expected);
    }

    #[test]
    fn handles_stay_unique_across_reuse(ops in prop::collection::vec(arb_op(), 0..128)) {
        let (_pool, live) = run(&ops);
        let unique: BTreeSet<BlockRef> = live.iter().copied().collect();
        prop_assert_eq!(unique.len(), live.len());
    }
}
