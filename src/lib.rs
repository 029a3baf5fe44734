/*!
 * seqring
 *
 * Priority wait-list and disruptor-style ring buffer primitives.
 *
 * Two layered components:
 * - `sync::WaitList`: a treap of per-address wait chains. Waiters park with
 *   a caller-supplied priority; wakers release every waiter at or below a
 *   threshold, in priority order.
 * - `sync::RingBuffer`: a fixed-capacity MPMC FIFO sequenced by four
 *   monotone cursors and two wait-lists, committing slots exactly in
 *   reservation order.
 *
 * Parking is abstracted behind `sync::Parker` so the primitives never know
 * how threads suspend; `ThreadParker` maps it onto `std::thread`.
 */

pub mod core;
pub mod sync;

pub use crate::core::errors::SyncError;
pub use crate::sync::parker::{Parker, ThreadParker};
pub use crate::sync::ring::{RingBuffer, RingCursors};
pub use crate::sync::spinlock::SpinLock;
pub use crate::sync::waitlist::{Priority, WaitList, PRIORITY_FIRST, PRIORITY_LAST};
