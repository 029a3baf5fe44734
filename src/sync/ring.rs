/*!
 * Disruptor-Style Ring Buffer
 *
 * A fixed-capacity MPMC FIFO sequenced by four monotone `u64` cursors:
 * `w_reserve`/`w_commit` for producers, `r_reserve`/`r_commit` for
 * consumers. Reservation hands out ids by fetch-add; commits publish them
 * strictly in reservation order by CAS-ing the commit cursor forward one id
 * at a time. Contended operations park on two priority wait-lists (one for
 * each side) with cursor-derived priorities, so a wake releases exactly the
 * waiters whose turn has come.
 *
 * The buffer carries no payload; callers index their own slot storage with
 * [`index_of`](RingBuffer::index_of), writing between `reserve_write` and
 * `commit_write` and reading between `reserve_read` and `commit_read`. A
 * reader that observes an id below `w_commit` is ordered after the writer
 * that committed it, so the slot contents are visible.
 *
 * Cursors never wrap: at one reservation per nanosecond the `u64` space
 * lasts about 584 years, so overflow is treated as unreachable rather than
 * threading wrapped arithmetic through every comparison.
 */

use crate::core::errors::SyncError;
use crate::core::limits::MIN_RING_PARALLELISM;
use crate::sync::parker::{Parker, ThreadParker};
use crate::sync::waitlist::{Priority, WaitList};
use log::trace;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

/// Snapshot of the four sequencing cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingCursors {
    pub w_reserve: u64,
    pub w_commit: u64,
    pub r_reserve: u64,
    pub r_commit: u64,
}

/// Shared cycle buffer sequencer for many readers and many writers.
///
/// Invariants, all cursors monotone:
/// `w_reserve >= w_commit >= r_commit`, `r_reserve >= r_commit`, and
/// `w_reserve <= r_commit + size` once reservations settle.
pub struct RingBuffer<P: Parker = ThreadParker> {
    size: u64,

    /// Readers park here: on an empty buffer (reservation side) and on
    /// out-of-turn read commits.
    readers: WaitList<P>,
    /// Writers park here: on a full buffer and on out-of-turn write commits.
    writers: WaitList<P>,

    w_reserve: AtomicU64,
    w_commit: AtomicU64,
    r_reserve: AtomicU64,
    r_commit: AtomicU64,
}

impl RingBuffer<ThreadParker> {
    /// Build a ring with `size` slots on the thread parker.
    ///
    /// Fails with `InvalidArgument` for a zero size and with
    /// `InsufficientParallelism` when fewer than 4 executors are available:
    /// the reserve/commit loops are spin-then-park, and below that floor a
    /// reserver can starve the committer it is waiting for.
    pub fn new(size: usize) -> Result<Self, SyncError> {
        let parallelism = thread::available_parallelism().map_or(1, |n| n.get());
        Self::build(size, ThreadParker::new(), parallelism)
    }

    /// Build with an explicit effective-executor count instead of probing
    /// the host (embedders that pin their own thread pool know better).
    pub fn with_parallelism(size: usize, parallelism: usize) -> Result<Self, SyncError> {
        Self::build(size, ThreadParker::new(), parallelism)
    }
}

impl<P: Parker + Clone> RingBuffer<P> {
    /// Build with an injected parker; parallelism is probed from the host.
    pub fn with_parker(size: usize, parker: P) -> Result<Self, SyncError> {
        let parallelism = thread::available_parallelism().map_or(1, |n| n.get());
        Self::build(size, parker, parallelism)
    }

    fn build(size: usize, parker: P, parallelism: usize) -> Result<Self, SyncError> {
        if size == 0 {
            return Err(SyncError::InvalidArgument("ring size must be >= 1".into()));
        }
        if parallelism < MIN_RING_PARALLELISM {
            return Err(SyncError::InsufficientParallelism {
                available: parallelism,
                required: MIN_RING_PARALLELISM,
            });
        }
        Ok(Self {
            size: size as u64,
            readers: WaitList::with_parker(parker.clone()),
            writers: WaitList::with_parker(parker),
            w_reserve: AtomicU64::new(0),
            w_commit: AtomicU64::new(0),
            r_reserve: AtomicU64::new(0),
            r_commit: AtomicU64::new(0),
        })
    }
}

impl<P: Parker> RingBuffer<P> {
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Slot index for a reservation id.
    pub fn index_of(&self, id: u64) -> usize {
        (id % self.size) as usize
    }

    /// Committed, unconsumed items (approximate under concurrency).
    pub fn len(&self) -> usize {
        let committed = self.w_commit.load(Ordering::SeqCst);
        let consumed = self.r_commit.load(Ordering::SeqCst);
        committed.saturating_sub(consumed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor snapshot for diagnostics and tests.
    pub fn cursors(&self) -> RingCursors {
        RingCursors {
            w_reserve: self.w_reserve.load(Ordering::SeqCst),
            w_commit: self.w_commit.load(Ordering::SeqCst),
            r_reserve: self.r_reserve.load(Ordering::SeqCst),
            r_commit: self.r_commit.load(Ordering::SeqCst),
        }
    }

    /// Claim the next write id, blocking while the buffer is full.
    pub fn reserve_write(&self) -> u64 {
        let id = self.w_reserve.fetch_add(1, Ordering::SeqCst);
        loop {
            let data_start = self.r_commit.load(Ordering::SeqCst);
            if id < data_start + self.size {
                return id;
            }

            // Full: park as a writer until a reader frees our slot. The
            // predicate re-reads r_commit under the wait-list lock so a
            // wake between the check above and the park is not lost.
            trace!("reserve_write {} waiting for r_commit {}", id, id - self.size + 1);
            let free_at = id - self.size + 1;
            block_on(&self.writers, free_at + 1, || {
                self.r_commit.load(Ordering::SeqCst) < free_at
            });
        }
    }

    /// Publish the write at `id`, blocking until every earlier write has
    /// committed. Wakes readers whose data became available.
    pub fn commit_write(&self, id: u64) {
        loop {
            if self
                .w_commit
                .compare_exchange(id, id + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // Threshold id + 2 releases the reader whose reservation
                // became satisfiable at this commit (priority id + 2) and
                // the next expected write committer (priority id + 1); a
                // committer woken ahead of its turn re-parks through its
                // needblock check.
                self.readers.wake(priority(id) + 2);
                return;
            }

            // Out of turn: park as a reader until the previous writer
            // commits.
            trace!("commit_write {} waiting for w_commit", id);
            block_on(&self.readers, priority(id), || {
                self.w_commit.load(Ordering::SeqCst) < id
            });
        }
    }

    /// Claim the next read id, blocking while the buffer is empty.
    pub fn reserve_read(&self) -> u64 {
        let id = self.r_reserve.fetch_add(1, Ordering::SeqCst);
        loop {
            let committed = self.w_commit.load(Ordering::SeqCst);
            if id < committed {
                return id;
            }

            // Empty: park as a reader until a writer commits our slot.
            trace!("reserve_read {} waiting for w_commit {}", id, id + 1);
            block_on(&self.readers, id + 2, || {
                self.w_commit.load(Ordering::SeqCst) < id + 1
            });
        }
    }

    /// Retire the read at `id`, blocking until every earlier read has
    /// committed. Wakes writers whose slot became free.
    pub fn commit_read(&self, id: u64) {
        loop {
            if self
                .r_commit
                .compare_exchange(id, id + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // Threshold id + 2 releases the writer whose slot this
                // retirement frees (reservation id + size, priority id + 2)
                // and the next expected read committer; early wakes re-park
                // through needblock.
                self.writers.wake(priority(id) + 2);
                return;
            }

            // Out of turn: park as a writer until the previous reader
            // commits.
            trace!("commit_read {} waiting for r_commit", id);
            block_on(&self.writers, priority(id), || {
                self.r_commit.load(Ordering::SeqCst) < id
            });
        }
    }
}

/// Commit-side wait priority for a reservation id: reservation order is
/// wake order, so the id itself is the key. The committer at the cursor
/// value holds the smallest priority on its chain, which is how a commit's
/// wake reaches the next expected committer and nothing earlier.
#[inline]
fn priority(id: u64) -> Priority {
    id
}

/// Contention waits are part of the protocol, not failures; the only
/// possible error is a caller parking from a context its parker does not
/// manage, which is a usage bug.
fn block_on<P: Parker>(list: &WaitList<P>, priority: Priority, needblock: impl FnMut() -> bool) {
    if let Err(err) = list.wait_if(priority, needblock) {
        panic!("ring buffer wait from an unmanaged executor: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_size() {
        let err = match RingBuffer::with_parallelism(0, 8) {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, SyncError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_low_parallelism() {
        let err = match RingBuffer::with_parallelism(8, 3) {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(
            err,
            SyncError::InsufficientParallelism {
                available: 3,
                required: MIN_RING_PARALLELISM
            }
        );
    }

    #[test]
    fn test_new_matches_host_parallelism() {
        let parallelism = thread::available_parallelism().map_or(1, |n| n.get());
        let result = RingBuffer::new(4);
        if parallelism >= MIN_RING_PARALLELISM {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(SyncError::InsufficientParallelism { .. })
            ));
        }
    }

    #[test]
    fn test_index_wraps_by_size() {
        let ring = RingBuffer::with_parallelism(4, 8).unwrap();
        assert_eq!(ring.size(), 4);
        assert_eq!(ring.index_of(0), 0);
        assert_eq!(ring.index_of(3), 3);
        assert_eq!(ring.index_of(4), 0);
        assert_eq!(ring.index_of(11), 3);
    }

    #[test]
    fn test_uncontended_round_trip() {
        let ring = RingBuffer::with_parallelism(2, 8).unwrap();
        assert_eq!(
            ring.cursors(),
            RingCursors {
                w_reserve: 0,
                w_commit: 0,
                r_reserve: 0,
                r_commit: 0
            }
        );
        assert!(ring.is_empty());

        let id = ring.reserve_write();
        assert_eq!(id, 0);
        ring.commit_write(id);
        assert_eq!(ring.len(), 1);

        let id = ring.reserve_read();
        assert_eq!(id, 0);
        ring.commit_read(id);

        assert_eq!(
            ring.cursors(),
            RingCursors {
                w_reserve: 1,
                w_commit: 1,
                r_reserve: 1,
                r_commit: 1
            }
        );
        assert!(ring.is_empty());
    }

    #[test]
    fn test_writer_fills_buffer_without_blocking() {
        let ring = RingBuffer::with_parallelism(3, 8).unwrap();
        for expected in 0..3 {
            let id = ring.reserve_write();
            assert_eq!(id, expected);
            ring.commit_write(id);
        }
        assert_eq!(ring.len(), 3);
        // One slot consumed frees exactly one more reservation.
        let id = ring.reserve_read();
        ring.commit_read(id);
        let id = ring.reserve_write();
        assert_eq!(id, 3);
        ring.commit_write(id);
        assert_eq!(ring.len(), 3);
    }
}
