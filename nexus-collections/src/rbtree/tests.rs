use super::*;
use crate::compare::{CompareBy, First, Greater, Identity, Less};
use crate::cursor::{BidirectionalPosition, Position};
use crate::testing::{Bomb, counters};
use nexus_alloc::System;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

type IntTree = RbTree<i32, i32, Identity, Less>;

fn items(tree: &IntTree) -> Vec<i32> {
    tree.iter().copied().collect()
}

// =========================================================================
// Shape
// =========================================================================

#[test]
fn empty_tree_has_no_header() {
    let tree = IntTree::new();
    assert!(tree.is_empty());
    assert_eq!(tree.first(), None);
    assert_eq!(tree.verify(), Ok(0));
    assert!(tree.cursor_begin().is_end());
    assert_eq!(tree.find(&3), tree.cursor_end());
}

#[test]
fn ascending_inserts_stay_balanced() {
    let mut tree = IntTree::new();
    for i in 0..1_000 {
        assert!(tree.insert_unique(i).1);
    }
    let black_height = tree.verify().unwrap();
    // A red-black tree of n nodes has height at most 2·log2(n + 1).
    assert!(black_height <= 11, "black height {black_height}");
    assert_eq!(items(&tree), (0..1_000).collect::<Vec<_>>());
    assert_eq!(tree.first(), Some(&0));
    assert_eq!(tree.last(), Some(&999));
}

#[test]
fn verify_after_every_random_insert_and_erase() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut tree = IntTree::new();
    for _ in 0..2_000 {
        tree.insert_equal(rng.random_range(0..300));
        tree.verify().unwrap();
    }
    for _ in 0..2_000 {
        let key = rng.random_range(0..300);
        tree.remove(&key);
        tree.verify().unwrap();
    }
}

#[test]
fn unique_insert_rejects_equivalent() {
    let mut tree = IntTree::new();
    assert!(tree.insert_unique(5).1);
    let (pos, inserted) = tree.insert_unique(5);
    assert!(!inserted);
    assert_eq!(pos.get(), Some(&5));
    assert_eq!(tree.len(), 1);
}

#[test]
fn equal_insert_keeps_arrival_order() {
    let mut tree: RbTree<(i32, char), i32, First, Less> = RbTree::new();
    for (k, c) in [(2, 'a'), (1, 'b'), (2, 'c'), (2, 'd'), (1, 'e')] {
        tree.insert_equal((k, c));
    }
    let order: Vec<char> = tree.iter().map(|&(_, c)| c).collect();
    assert_eq!(order, ['b', 'e', 'a', 'c', 'd']);
    assert_eq!(tree.count(&2), 3);
}

// =========================================================================
// Lookup
// =========================================================================

#[test]
fn bounds_and_equal_range() {
    let mut tree = IntTree::new();
    for v in [10, 20, 20, 20, 30] {
        tree.insert_equal(v);
    }
    assert_eq!(tree.lower_bound(&20).get(), Some(&20));
    assert_eq!(tree.upper_bound(&20).get(), Some(&30));
    assert_eq!(tree.lower_bound(&15).get(), Some(&20));
    assert!(tree.upper_bound(&30).is_end());

    let (lo, hi) = tree.equal_range(&20);
    let mut n = 0;
    let mut c = lo;
    while c != hi {
        n += 1;
        c.step();
    }
    assert_eq!(n, 3);
    assert!(tree.contains(&30));
    assert!(!tree.contains(&25));
    assert_eq!(tree.get(&10), Some(&10));
}

#[test]
fn range_iteration() {
    let tree: IntTree = {
        let mut t = IntTree::new();
        for i in 0..20 {
            t.insert_unique(i * 2);
        }
        t
    };
    let mid: Vec<i32> = tree.range(5..=12).copied().collect();
    assert_eq!(mid, [6, 8, 10, 12]);
    let tail: Vec<i32> = tree.range(33..).rev().copied().collect();
    assert_eq!(tail, [38, 36, 34]);
    assert_eq!(tree.range(13..13).count(), 0);
    assert_eq!(tree.range(30..10).count(), 0);
}

#[test]
fn cursor_steps_back_from_end() {
    let mut tree = IntTree::new();
    for v in [3, 1, 2] {
        tree.insert_unique(v);
    }
    let mut c = tree.cursor_end();
    c.step_back();
    assert_eq!(c.get(), Some(&3));
    c.step_back();
    c.step_back();
    assert_eq!(c.get(), Some(&1));
    c.step();
    assert_eq!(unsafe { *c.as_ptr() }, 2);
}

#[test]
fn single_node_cursor_round_trip() {
    let mut tree = IntTree::new();
    tree.insert_unique(42);
    let mut c = tree.cursor_begin();
    c.step();
    assert!(c.is_end());
    c.step_back();
    assert_eq!(c.get(), Some(&42));
}

#[test]
fn reverse_ordering() {
    let mut tree: RbTree<i32, i32, Identity, Greater> = RbTree::new();
    for v in [1, 5, 3] {
        tree.insert_unique(v);
    }
    assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [5, 3, 1]);
}

// =========================================================================
// Erase
// =========================================================================

#[test]
fn erase_key_and_range() {
    let mut tree = IntTree::new();
    for v in [1, 2, 2, 3, 4, 4, 4, 5] {
        tree.insert_equal(v);
    }
    assert_eq!(tree.erase_key(&4), 3);
    assert_eq!(tree.erase_key(&9), 0);
    assert_eq!(tree.erase_range(2..=3), 3);
    assert_eq!(items(&tree), [1, 5]);
    tree.verify().unwrap();

    assert_eq!(tree.erase_range(..), 2);
    assert!(tree.is_empty());
    tree.verify().unwrap();
}

#[test]
fn pop_first_and_last() {
    let mut tree = IntTree::new();
    for v in 0..10 {
        tree.insert_unique(v);
    }
    assert_eq!(tree.pop_first(), Some(0));
    assert_eq!(tree.pop_last(), Some(9));
    assert_eq!(tree.first(), Some(&1));
    assert_eq!(tree.last(), Some(&8));
    tree.verify().unwrap();
}

#[test]
fn cursor_mut_removes_and_hints() {
    let mut tree = IntTree::new();
    for v in [10, 20, 30, 40] {
        tree.insert_unique(v);
    }
    {
        let mut c = tree.lower_bound_mut(&20);
        assert_eq!(c.remove_current(), Some(20));
        assert_eq!(c.get(), Some(&30));
        // 25 belongs right before 30.
        assert!(c.insert_unique(25));
        assert_eq!(c.get(), Some(&25));
        assert!(!c.insert_unique(30));
        assert_eq!(c.get(), Some(&30));
        c.move_prev();
        c.move_prev();
        assert_eq!(c.get(), Some(&10));
    }
    assert_eq!(items(&tree), [10, 25, 30, 40]);
    tree.verify().unwrap();
}

#[test]
fn hinted_inserts_at_end_build_sorted_tree() {
    let mut tree = IntTree::new();
    let mut c = tree.cursor_mut_begin();
    for v in 0..500 {
        assert!(c.insert_unique(v));
        c.move_next();
        assert!(c.is_end());
    }
    drop(c);
    assert_eq!(tree.len(), 500);
    tree.verify().unwrap();
}

#[test]
fn wrong_hint_still_inserts_in_order() {
    let mut tree = IntTree::new();
    for v in [10, 20, 30] {
        tree.insert_unique(v);
    }
    let mut c = tree.cursor_mut_begin();
    assert!(c.insert_unique(35));
    assert!(c.insert_unique(5));
    assert_eq!(items(&tree), [5, 10, 20, 30, 35]);
}

#[test]
fn clear_and_reuse() {
    let mut tree = IntTree::new();
    for v in 0..50 {
        tree.insert_unique(v);
    }
    tree.clear();
    assert!(tree.is_empty());
    tree.verify().unwrap();
    tree.insert_unique(7);
    assert_eq!(items(&tree), [7]);
}

// =========================================================================
// Panics
// =========================================================================

type BombTree = RbTree<Bomb, Bomb, Identity, CompareBy<fn(&Bomb, &Bomb) -> bool>>;

fn by_value(a: &Bomb, b: &Bomb) -> bool {
    a.value < b.value
}

#[test]
fn clone_copies_shape_and_rolls_back_on_panic() {
    let (budget, live) = counters(usize::MAX);
    let mut tree: BombTree = RbTree::with_compare(CompareBy(by_value));
    for v in 0..100 {
        tree.insert_unique(Bomb::new(v, &budget, &live));
    }

    budget.set(60);
    let result = catch_unwind(AssertUnwindSafe(|| tree.clone()));
    assert!(result.is_err());
    assert_eq!(live.get(), 100);

    budget.set(usize::MAX);
    let copy = tree.clone();
    assert_eq!(copy.verify(), tree.verify());
    assert!(copy.iter().map(|b| b.value).eq(0..100));
    drop(copy);
    drop(tree);
    assert_eq!(live.get(), 0);
}

#[test]
fn panicking_compare_leaves_tree_unchanged() {
    let calls = Cell::new(0usize);
    let limit = Cell::new(usize::MAX);
    let cmp = CompareBy(|a: &i32, b: &i32| {
        calls.set(calls.get() + 1);
        if calls.get() > limit.get() {
            panic!("compare failed");
        }
        a < b
    });
    let mut tree = RbTree::<i32, i32, Identity, _>::with_compare(cmp);
    for v in 0..64 {
        tree.insert_unique(v);
    }

    calls.set(0);
    limit.set(3);
    let result = catch_unwind(AssertUnwindSafe(|| {
        tree.insert_unique(1_000);
    }));
    assert!(result.is_err());

    limit.set(usize::MAX);
    assert_eq!(tree.len(), 64);
    assert!(tree.iter().copied().eq(0..64));
    tree.verify().unwrap();
}

// =========================================================================
// Model check
// =========================================================================

#[test]
fn matches_btreemap_under_random_ops() {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let mut tree: RbTree<(u32, u32), u32, First, Less, System> =
        RbTree::new_in(Less, System);
    let mut model: BTreeMap<u32, u32> = BTreeMap::new();

    for step in 0..20_000u32 {
        let key = rng.random_range(0..512);
        match rng.random_range(0..4) {
            0 | 1 => {
                let inserted = tree.insert_unique((key, step)).1;
                let fresh = !model.contains_key(&key);
                if fresh {
                    model.insert(key, step);
                }
                assert_eq!(inserted, fresh);
            }
            2 => assert_eq!(tree.remove(&key).map(|(_, v)| v), model.remove(&key)),
            _ => assert_eq!(tree.get(&key).map(|&(_, v)| v), model.get(&key).copied()),
        }
    }
    tree.verify().unwrap();
    assert!(tree.iter().map(|&(k, v)| (k, v)).eq(model.into_iter()));
}

#[test]
fn owned_iteration_both_ends() {
    let mut tree = IntTree::new();
    for v in 0..6 {
        tree.insert_unique(v);
    }
    let mut it = tree.into_iter();
    assert_eq!(it.next(), Some(0));
    assert_eq!(it.next_back(), Some(5));
    assert_eq!(it.len(), 4);
    assert_eq!(it.collect::<Vec<_>>(), [1, 2, 3, 4]);
}
