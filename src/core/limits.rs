/*!
 * Tuning Constants
 *
 * Centralized limits and thresholds with their rationale.
 */

/// Minimum effective executors required to construct a ring buffer.
///
/// The reserve/commit loops are spin-then-park; with fewer than 4 runnable
/// executors a reserver can hold an id whose committer never gets scheduled,
/// and the loop degenerates into livelock. [PERF]
pub const MIN_RING_PARALLELISM: usize = 4;

/// Spin-lock iterations in the tight spin phase before yielding.
///
/// Treap critical sections are a few pointer updates, so a held lock is
/// released within tens of nanoseconds; a short `spin_loop` burst beats an
/// immediate yield. [PERF]
pub const SPINLOCK_SPIN_ITERS: u32 = 64;

/// Initial node capacity of a wait-list arena.
///
/// Enough for typical waiter counts without reallocation; the arena grows
/// on demand after this.
pub const WAITLIST_ARENA_CAPACITY: usize = 32;
