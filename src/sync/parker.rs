/*!
 * Parker Capability
 *
 * The wait-list suspends and resumes executors through this trait instead of
 * calling into a scheduler directly. That keeps the treap code host-agnostic
 * and lets tests substitute a deterministic parker (scripted tickets,
 * recorded wake order, simulated unmanaged contexts).
 */

use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};

/// Park/unpark capability injected into a wait-list.
///
/// # Contract
///
/// - `current` returns a handle for the calling executor, or `None` when the
///   caller is not suspendable (a wait from such a context is an error).
/// - `park` blocks the calling executor until a matching `unpark`. Spurious
///   returns are absorbed by the implementation, not the caller.
/// - `unpark` makes the waiter runnable ahead of other work and must be safe
///   to call while a spin lock is held.
/// - `rand32` feeds treap ticket selection; quality only affects balance.
pub trait Parker: Send + Sync {
    type Waiter: Clone + Send + Sync + 'static;

    fn current(&self) -> Option<Self::Waiter>;
    fn park(&self, waiter: &Self::Waiter);
    fn unpark(&self, waiter: &Self::Waiter);
    fn rand32(&self) -> u32;
}

/// Waiter handle for [`ThreadParker`].
///
/// One handle exists per OS thread and is reused across waits (a thread
/// waits on at most one address at a time). The `released` flag is the
/// park token: `unpark` sets it before waking, and `park` loops on it so
/// spurious `thread::park` returns never leak out.
#[derive(Clone)]
pub struct ThreadWaiter(Arc<WaiterState>);

struct WaiterState {
    thread: Thread,
    released: AtomicBool,
}

thread_local! {
    static CURRENT_WAITER: ThreadWaiter = ThreadWaiter(Arc::new(WaiterState {
        thread: thread::current(),
        released: AtomicBool::new(false),
    }));
}

/// Production parker on `std::thread` park/unpark.
///
/// Every OS thread is suspendable, so `current` never returns `None` here;
/// the `None` path exists for hosts that distinguish managed executors.
#[derive(Clone, Copy, Default)]
pub struct ThreadParker;

impl ThreadParker {
    pub const fn new() -> Self {
        Self
    }
}

impl Parker for ThreadParker {
    type Waiter = ThreadWaiter;

    fn current(&self) -> Option<ThreadWaiter> {
        let waiter = CURRENT_WAITER.with(|w| w.clone());
        // Re-arm the handle for this wait. Only the owning thread calls
        // `current`, and its previous wait has fully completed.
        waiter.0.released.store(false, Ordering::Relaxed);
        Some(waiter)
    }

    fn park(&self, waiter: &ThreadWaiter) {
        while !waiter.0.released.load(Ordering::Acquire) {
            thread::park();
        }
    }

    fn unpark(&self, waiter: &ThreadWaiter) {
        waiter.0.released.store(true, Ordering::Release);
        waiter.0.thread.unpark();
    }

    fn rand32(&self) -> u32 {
        rand::thread_rng().gen()
    }
}
