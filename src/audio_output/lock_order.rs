// lock_order.rs - Ranked locks for the pipeline

//! Mutexes tagged with an acquisition rank.
//!
//! The pipeline has three lock tiers that must always be taken in the order
//! coordinator, then input stream, then FIFO. In debug builds every thread
//! records the ranks it currently holds and taking a lock whose rank is not
//! strictly above all of them panics. Release builds skip the bookkeeping.

use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};

/// Position of a lock in the global acquisition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockRank {
    /// Admission slot, output and mixer
    Coordinator = 1,
    /// Per-stream state and flags
    Input = 2,
    /// Per-stream pending FIFO
    Fifo = 3,
}

#[cfg(debug_assertions)]
mod held {
    use super::LockRank;
    use std::cell::RefCell;

    thread_local! {
        static HELD: RefCell<Vec<LockRank>> = const { RefCell::new(Vec::new()) };
    }

    pub fn acquire(rank: LockRank) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(&top) = held.iter().max() {
                assert!(
                    rank > top,
                    "lock order violation: acquiring {:?} while holding {:?}",
                    rank,
                    top
                );
            }
            held.push(rank);
        });
    }

    pub fn release(rank: LockRank) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(idx) = held.iter().rposition(|&r| r == rank) {
                held.remove(idx);
            }
        });
    }

    pub fn current() -> Vec<LockRank> {
        HELD.with(|held| held.borrow().clone())
    }
}

/// A parking_lot mutex with a fixed rank
#[derive(Debug)]
pub struct RankedMutex<T> {
    rank: LockRank,
    inner: Mutex<T>,
}

impl<T> RankedMutex<T> {
    pub fn new(rank: LockRank, value: T) -> Self {
        RankedMutex {
            rank,
            inner: Mutex::new(value),
        }
    }

    /// Block until the lock is available
    ///
    /// Panics in debug builds if the calling thread already holds a lock of
    /// equal or higher rank.
    pub fn lock(&self) -> RankedGuard<'_, T> {
        #[cfg(debug_assertions)]
        held::acquire(self.rank);
        RankedGuard {
            guard: self.inner.lock(),
            #[cfg(debug_assertions)]
            rank: self.rank,
        }
    }
}

pub struct RankedGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    #[cfg(debug_assertions)]
    rank: LockRank,
}

impl<T> Deref for RankedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for RankedGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for RankedGuard<'_, T> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        held::release(self.rank);
    }
}

/// Ranks held by the calling thread (debug builds only)
#[cfg(debug_assertions)]
pub fn held_ranks() -> Vec<LockRank> {
    held::current()
}
