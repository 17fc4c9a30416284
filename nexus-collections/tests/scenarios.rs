//! End-to-end container scenarios.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use nexus_collections::{Deque, List, Map, Vector};

/// Clones succeed while the shared budget lasts.
#[derive(Debug)]
struct Fragile {
    value: u32,
    budget: Rc<Cell<usize>>,
}

impl Fragile {
    fn new(value: u32, budget: &Rc<Cell<usize>>) -> Self {
        Self {
            value,
            budget: budget.clone(),
        }
    }
}

impl Clone for Fragile {
    fn clone(&self) -> Self {
        let left = self.budget.get();
        if left == 0 {
            panic!("clone failed");
        }
        self.budget.set(left - 1);
        Self::new(self.value, &self.budget)
    }
}

fn values<'a>(it: impl Iterator<Item = &'a Fragile>) -> Vec<u32> {
    it.map(|f| f.value).collect()
}

#[test]
fn vector_growth_preserves_content() {
    let mut v: Vector<u32> = Vector::new();
    let mut capacities = Vec::new();
    for i in 1..=1000 {
        v.push_back(i);
        if capacities.last() != Some(&v.capacity()) {
            capacities.push(v.capacity());
        }
    }

    assert_eq!(v.len(), 1000);
    assert!(v.capacity() >= 1000);
    for (i, x) in v.iter().enumerate() {
        assert_eq!(*x, i as u32 + 1);
    }
    // geometric growth: one capacity per doubling, plus slack
    assert!(capacities.len() <= 12, "capacities: {capacities:?}");
}

#[test]
fn deque_front_back_symmetry() {
    let mut d: Deque<i32> = Deque::new();
    d.push_back(1);
    d.push_back(2);
    d.push_back(3);
    d.push_front(0);

    assert_eq!(d.len(), 4);
    assert_eq!(d.iter().copied().collect::<Vec<_>>(), [0, 1, 2, 3]);
    assert_eq!(d.front(), Some(&0));
    assert_eq!(d.back(), Some(&3));

    let mut d: Deque<i32> = [0, 1, 10, 11, 7, 8, 9, 5, 5, 4, 2, 3].into_iter().collect();
    d.insert(1, 4);
    assert_eq!(
        d.iter().copied().collect::<Vec<_>>(),
        [0, 4, 1, 10, 11, 7, 8, 9, 5, 5, 4, 2, 3]
    );
    assert!(d.verify().is_ok());
}

#[test]
fn ordered_map_ignores_insertion_order() {
    let orders: [[i32; 5]; 3] = [[10, 5, 15, 3, 7], [3, 5, 7, 10, 15], [15, 7, 3, 10, 5]];
    for keys in orders {
        let mut m: Map<i32, ()> = Map::new();
        for k in keys {
            m.insert(k, ());
        }
        assert_eq!(m.len(), 5);
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), [3, 5, 7, 10, 15]);

        assert_eq!(m.remove(&10), Some(()));
        assert_eq!(m.len(), 4);
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), [3, 5, 7, 15]);
        assert!(m.as_tree().verify().is_ok());
    }
}

#[test]
fn vector_copy_failure_keeps_state() {
    let budget = Rc::new(Cell::new(usize::MAX));
    let mut v: Vector<Fragile> = Vector::with_capacity(2);
    v.push_back(Fragile::new(1, &budget));
    v.push_back(Fragile::new(2, &budget));
    let cap = v.capacity();
    let three = Fragile::new(3, &budget);

    budget.set(0);
    let result = catch_unwind(AssertUnwindSafe(|| v.insert_slice(2, std::slice::from_ref(&three))));
    assert!(result.is_err());
    assert_eq!(v.len(), 2);
    assert_eq!(v.capacity(), cap);
    assert_eq!(values(v.iter()), [1, 2]);

    // resize reserves before filling, so only the contents are restored
    let result = catch_unwind(AssertUnwindSafe(|| v.resize_value(5, &three)));
    assert!(result.is_err());
    assert_eq!(values(v.iter()), [1, 2]);
}

#[test]
fn deque_insert_rollback() {
    let budget = Rc::new(Cell::new(usize::MAX));
    let mut d: Deque<Fragile> = Deque::new();
    for v in 1..=3 {
        d.push_back(Fragile::new(v, &budget));
    }
    let four = Fragile::new(4, &budget);

    budget.set(0);
    let result = catch_unwind(AssertUnwindSafe(|| d.insert_n(1, 1, &four)));
    assert!(result.is_err());
    assert_eq!(values(d.iter()), [1, 2, 3]);
    assert!(d.verify().is_ok());

    // several copies, failing partway through
    budget.set(2);
    let result = catch_unwind(AssertUnwindSafe(|| d.insert_n(2, 5, &four)));
    assert!(result.is_err());
    assert_eq!(values(d.iter()), [1, 2, 3]);
    assert!(d.verify().is_ok());
}

#[test]
fn sorted_list_merge() {
    let mut a: List<i32> = [1, 3, 5, 7].into_iter().collect();
    let mut b: List<i32> = [2, 4, 6, 8].into_iter().collect();
    a.merge(&mut b);
    assert_eq!(a.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(b.is_empty());
    assert!(a.verify().is_ok());

    // equal keys: elements of `self` stay ahead of those from `other`
    let mut a: List<(i32, char)> = [(1, 'a'), (2, 'a'), (2, 'b')].into_iter().collect();
    let mut b: List<(i32, char)> = [(1, 'x'), (2, 'x'), (3, 'x')].into_iter().collect();
    a.merge_by(&mut b, |l, r| l.0 < r.0);
    assert_eq!(
        a.iter().copied().collect::<Vec<_>>(),
        [(1, 'a'), (1, 'x'), (2, 'a'), (2, 'b'), (2, 'x'), (3, 'x')]
    );
}
