//! Application lifecycle: maps, drain and teardown exit codes.

use picofuse_core::{EXIT_MEMORY_LEAKS, EXIT_SUCCESS};
use picofuse_runtime::{Application, MapError};
use picofuse_test_utils::test_app;

// ── maps ───────────────────────────────────────────────────────────

#[test]
fn empty_map_reports_declared_capacity() {
    let mut app = test_app();
    let map = app.new_map(10).unwrap();
    assert_eq!(app.map_stats(map).unwrap(), (0, 10));
    app.free_value(map).unwrap();
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn fill_read_and_empty_a_map() {
    let mut app = test_app();
    let map = app.new_map(10).unwrap();

    for i in 1..=10usize {
        app.map_set(map, i, Some(i)).unwrap();
        assert_eq!(app.map_stats(map).unwrap().0, i);
    }
    for i in 1..=10usize {
        assert_eq!(app.map_get(map, i).unwrap(), Some(i));
    }
    for i in 1..=10usize {
        app.map_set(map, i, None).unwrap();
        assert_eq!(app.map_get(map, i).unwrap(), None);
        assert_eq!(app.map_stats(map).unwrap().0, 10 - i);
    }

    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn eleventh_key_is_rejected_without_mutation() {
    let mut app = test_app();
    let map = app.new_map(10).unwrap();
    for i in 1..=10usize {
        app.map_set(map, i, Some(i * 100)).unwrap();
    }
    assert_eq!(
        app.map_set(map, 11, Some(1)),
        Err(MapError::Full { capacity: 10 })
    );
    assert_eq!(app.map_stats(map).unwrap(), (10, 10));
    assert_eq!(app.map_get(map, 11).unwrap(), None);
    for i in 1..=10usize {
        assert_eq!(app.map_get(map, i).unwrap(), Some(i * 100));
    }
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

// ── drain ──────────────────────────────────────────────────────────

#[test]
fn drain_is_idempotent_at_a_fixed_point() {
    let mut app = test_app();
    let keep = app.new_str("keep").unwrap();
    app.retain(keep);
    for i in 0..8 {
        let _ = app.new_u32(i).unwrap();
    }
    let list = app.new_list().unwrap();
    let element = app.new_u8(1).unwrap();
    app.push_back(list, element).unwrap();

    app.drain_all();
    let live = app.metrics().pool.live_blocks;
    assert_eq!(app.drain(), 0);
    assert_eq!(app.drain_all(), 0);
    assert_eq!(app.metrics().pool.live_blocks, live);
    assert!(app.contains(keep));

    app.release(keep);
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn orphans_stay_resident_until_drained() {
    let mut app = test_app();
    let v = app.new_u8(1).unwrap();
    app.retain(v);
    assert!(app.release(v));
    assert!(app.contains(v));
    assert_eq!(app.ref_count(v).unwrap(), 0);
    app.drain();
    assert!(!app.contains(v));
}

// ── teardown ───────────────────────────────────────────────────────

#[test]
fn retained_value_is_a_leak() {
    let mut app = test_app();
    let v = app.new_data(&[1, 2, 3]).unwrap();
    app.retain(v);
    assert_eq!(app.destroy(), EXIT_MEMORY_LEAKS);
}

#[test]
fn retained_list_leaks_its_elements_too() {
    let mut app = test_app();
    let list = app.new_list().unwrap();
    let a = app.new_u8(1).unwrap();
    app.push_back(list, a).unwrap();
    app.retain(list);
    assert_eq!(app.destroy(), EXIT_MEMORY_LEAKS);
}

#[test]
fn orphans_are_not_leaks() {
    let mut app = test_app();
    for i in 0..16 {
        let _ = app.new_u16(i).unwrap();
    }
    assert_eq!(app.destroy(), EXIT_SUCCESS);
}

#[test]
fn metrics_track_allocations_and_drains() {
    let mut app = Application::new().unwrap();
    let base = app.metrics();
    let _ = app.new_u8(1).unwrap();
    let _ = app.new_u8(2).unwrap();
    let m = app.metrics();
    assert_eq!(m.pool.live_blocks, base.pool.live_blocks + 2);
    assert_eq!(m.pool.allocations, base.pool.allocations + 2);
    assert_eq!(app.drain(), 2);
    let m = app.metrics();
    assert_eq!(m.blocks_drained, 2);
    assert_eq!(m.drain_sweeps, 1);
    assert_eq!(m.pool.frees, base.pool.frees + 2);
}
