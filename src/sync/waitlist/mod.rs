/*!
 * Priority Wait-List
 *
 * Blocks executors on a semaphore cell with a caller-supplied priority and
 * wakes them back up in priority order. Waiters for the same cell form a
 * priority-sorted chain hanging off one treap node; the treap is keyed by
 * cell address so one root can index any number of cells.
 *
 * # Protocol
 *
 * `wait` takes the treap lock, raises `nwait`, then consults the optional
 * `needblock` predicate while the lock is held. A `false` answer restores
 * `nwait` and cancels the park with the semaphore and treap untouched —
 * this closes the window between a caller's last lock-free check and the
 * enqueue. Otherwise the semaphore is bumped, a node is linked, and the
 * caller parks through the injected [`Parker`] after the lock drops.
 *
 * `wake` has a lock-free fast path (`nwait == 0`), then dequeues every
 * waiter at or below the threshold under the lock and subtracts the count
 * from both counters before unlocking.
 */

mod arena;
mod treap;

use crate::core::errors::SyncError;
use crate::sync::parker::{Parker, ThreadParker};
use crate::sync::spinlock::SpinLock;
use log::trace;
use std::sync::atomic::{AtomicU32, Ordering};
use treap::Treap;

/// Ordering key for waiters on one cell. Smaller wakes earlier.
pub type Priority = u64;

/// Sentinel: enqueue in front of every existing waiter.
pub const PRIORITY_FIRST: Priority = 0;

/// Sentinel: enqueue behind every existing waiter, skipping the sorted
/// insertion scan.
pub const PRIORITY_LAST: Priority = u64::MAX;

/// Lock, counters, and treap for a set of semaphore cells.
///
/// Split from [`WaitList`] so the enqueue/dequeue machinery can serve any
/// address-keyed cell; the public wrapper binds it to one owned cell.
pub(crate) struct SemRoot<P: Parker> {
    treap: SpinLock<Treap<P::Waiter>>,
    /// Waiters across every cell indexed by this root. Raised under the
    /// lock before parking, so the zero fast path in `wake` cannot miss a
    /// parked waiter.
    nwait: AtomicU32,
    parker: P,
}

impl<P: Parker> SemRoot<P> {
    pub fn new(parker: P) -> Self {
        Self {
            treap: SpinLock::new(Treap::new()),
            nwait: AtomicU32::new(0),
            parker,
        }
    }

    /// Park the caller on `sem` with `priority`.
    ///
    /// Returns `Ok(false)` without suspending when `needblock` reported the
    /// wait condition already satisfied; the semaphore and the treap are
    /// left untouched in that case.
    pub fn wait(
        &self,
        sem: &AtomicU32,
        priority: Priority,
        needblock: Option<&mut dyn FnMut() -> bool>,
    ) -> Result<bool, SyncError> {
        let waiter = self
            .parker
            .current()
            .ok_or(SyncError::NotOnManagedThread)?;

        let mut treap = self.treap.lock();
        // Raised before the predicate runs: the zero fast path in wake must
        // not be able to read nwait between the predicate's cursor load and
        // this increment, or the wake that satisfies the predicate could be
        // skipped while we park.
        self.nwait.fetch_add(1, Ordering::SeqCst);
        if let Some(check) = needblock {
            if !check() {
                self.nwait.fetch_sub(1, Ordering::SeqCst);
                return Ok(false);
            }
        }

        sem.fetch_add(1, Ordering::Relaxed);

        let key = sem_key(sem);
        trace!("wait: queue on {:#x} priority {}", key, priority);
        let handle = waiter.clone();
        treap.enqueue(key, handle, priority, || self.parker.rand32());
        #[cfg(debug_assertions)]
        treap.verify_key_count(key, sem.load(Ordering::Relaxed));
        drop(treap);

        self.parker.park(&waiter);
        Ok(true)
    }

    /// Wake every waiter on `sem` at or below `threshold`; returns how many.
    pub fn wake(&self, sem: &AtomicU32, threshold: Priority) -> usize {
        // Easy case: no waiters. Safe because wait raises nwait before it
        // ever parks.
        if self.nwait.load(Ordering::SeqCst) == 0 {
            return 0;
        }

        let mut treap = self.treap.lock();
        let key = sem_key(sem);
        let parker = &self.parker;
        let num = treap.dequeue_up_to(key, threshold, |waiter| parker.unpark(&waiter));
        if num > 0 {
            self.nwait.fetch_sub(num, Ordering::SeqCst);
            sem.fetch_sub(num, Ordering::Relaxed);
        }
        #[cfg(debug_assertions)]
        treap.verify_key_count(key, sem.load(Ordering::Relaxed));
        trace!("wake: released {} on {:#x} threshold {}", num, key, threshold);
        num as usize
    }
}

#[inline]
fn sem_key(sem: &AtomicU32) -> usize {
    sem as *const AtomicU32 as usize
}

/// A prioritized wait queue bound to one semaphore cell.
///
/// Waiters suspend with [`wait`](Self::wait) or
/// [`wait_if`](Self::wait_if) and resume in non-decreasing priority order
/// when another thread calls [`wake`](Self::wake) with a threshold at or
/// above their priority. Dropping the list while waiters are parked leaves
/// them parked; the owner is responsible for draining first.
pub struct WaitList<P: Parker = ThreadParker> {
    root: SemRoot<P>,
    /// Owned cell; its address keys the treap, its value counts waiters.
    /// Boxed so the address survives moves of the `WaitList` itself.
    sem: Box<AtomicU32>,
}

impl WaitList<ThreadParker> {
    pub fn new() -> Self {
        Self::with_parker(ThreadParker::new())
    }
}

impl Default for WaitList<ThreadParker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Parker> WaitList<P> {
    pub fn with_parker(parker: P) -> Self {
        Self {
            root: SemRoot::new(parker),
            sem: Box::new(AtomicU32::new(0)),
        }
    }

    /// Park the calling executor until a wake at or above `priority`.
    pub fn wait(&self, priority: Priority) -> Result<(), SyncError> {
        self.root.wait(&self.sem, priority, None).map(|_| ())
    }

    /// Park unless `needblock`, evaluated under the wait-list lock, reports
    /// the condition already satisfied.
    ///
    /// Returns `Ok(true)` if the caller parked and was woken, `Ok(false)`
    /// if the park was cancelled.
    pub fn wait_if<F>(&self, priority: Priority, mut needblock: F) -> Result<bool, SyncError>
    where
        F: FnMut() -> bool,
    {
        self.root.wait(&self.sem, priority, Some(&mut needblock))
    }

    /// Wake every waiter whose priority is at or below `threshold`, in
    /// priority order. Returns the number released. Never blocks.
    pub fn wake(&self, threshold: Priority) -> usize {
        self.root.wake(&self.sem, threshold)
    }

    /// Number of currently queued waiters (diagnostics; immediately stale).
    pub fn waiter_count(&self) -> usize {
        self.sem.load(Ordering::Relaxed) as usize
    }
}
