/*!
 * Synchronization Primitives
 *
 * Priority wait-list and ring buffer building blocks:
 * - `SpinLock`: word-sized test-and-set lock guarding treap mutations
 * - `Parker`: injected park/unpark capability (`ThreadParker` on std)
 * - `WaitList`: treap of priority-ordered wait chains keyed by sem address
 * - `RingBuffer`: four-cursor reserve/commit MPMC FIFO on two wait-lists
 *
 * # Architecture
 *
 * The wait-list never parks a thread itself; it enqueues a waiter handle
 * under its spin lock and hands suspension to the `Parker`. The ring buffer
 * in turn never touches the treap; it only speaks the wait/wake protocol
 * with cursor-derived priorities.
 */

pub mod parker;
pub mod ring;
pub mod spinlock;
pub mod waitlist;

pub use parker::{Parker, ThreadParker};
pub use ring::{RingBuffer, RingCursors};
pub use spinlock::{SpinGuard, SpinLock};
pub use waitlist::{Priority, WaitList, PRIORITY_FIRST, PRIORITY_LAST};
