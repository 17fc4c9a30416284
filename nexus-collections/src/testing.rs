//! Shared test fixtures.

use std::cell::Cell;
use std::rc::Rc;

/// Element whose clone panics when the shared budget hits zero. Every live
/// instance is counted in `live`.
#[derive(Debug)]
pub(crate) struct Bomb {
    pub(crate) value: i32,
    budget: Rc<Cell<usize>>,
    live: Rc<Cell<isize>>,
}

impl Bomb {
    pub(crate) fn new(value: i32, budget: &Rc<Cell<usize>>, live: &Rc<Cell<isize>>) -> Self {
        live.set(live.get() + 1);
        Bomb {
            value,
            budget: budget.clone(),
            live: live.clone(),
        }
    }
}

impl Clone for Bomb {
    fn clone(&self) -> Self {
        let left = self.budget.get();
        if left == 0 {
            panic!("clone failed");
        }
        self.budget.set(left - 1);
        Bomb::new(self.value, &self.budget, &self.live)
    }
}

impl Drop for Bomb {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl PartialEq for Bomb {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// Fresh clone budget and live counter.
pub(crate) fn counters(budget: usize) -> (Rc<Cell<usize>>, Rc<Cell<isize>>) {
    (Rc::new(Cell::new(budget)), Rc::new(Cell::new(0)))
}
