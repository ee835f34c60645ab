//! Condition variables
//!
//! `Condvar` pairs with a `Mutex`: `wait` atomically releases the mutex the
//! guard holds, blocks until signaled, and re-acquires it before returning.
//! Spurious wakeups are possible with the native backend, so callers
//! re-check their predicate in a loop as usual.
//!
//! # Backends
//!
//! - `NativeCond` (Unix): `pthread_cond_t` on a monotonic clock where the
//!   platform allows it
//! - `EmulatedCond<E>` (everywhere): FIFO wait queue driven by two
//!   auto-reset events; the platform backend on Windows
//!
//! The emulated backend wakes waiters strictly in arrival order and never
//! wakes anyone spuriously.

use std::time::Duration;
use strand_core::{kerror, StrandResult};

use crate::mutex::{MutexGuard, RawMutex};

mod emulated;
pub use emulated::EmulatedCond;

#[cfg(unix)]
mod native;
#[cfg(unix)]
pub use native::NativeCond;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Condition variable backend for this platform
        pub type PlatformCond = EmulatedCond<crate::event::PlatformEvent>;
    } else {
        /// Condition variable backend for this platform
        pub type PlatformCond = NativeCond;
    }
}

/// Condition variable implementation
pub trait CondBackend: Send + Sync + Sized {
    fn new() -> StrandResult<Self>;

    /// Release `lock`, block until signaled or `timeout` elapses, re-lock
    ///
    /// Returns `false` on timeout. `lock` is held again in both cases.
    ///
    /// # Safety
    ///
    /// The calling thread must hold `lock`.
    unsafe fn wait(&self, lock: &RawMutex, timeout: Option<Duration>) -> bool;

    /// Wake one waiter, if any
    fn signal(&self);

    /// Wake every current waiter
    fn broadcast(&self);
}

/// Condition variable over a `CondBackend`
pub struct Condvar<B: CondBackend = PlatformCond> {
    backend: B,
}

impl Condvar<PlatformCond> {
    pub fn new() -> StrandResult<Self> {
        Self::with_backend()
    }
}

impl<B: CondBackend> Condvar<B> {
    /// Create over an explicit backend, e.g. `Condvar::<EmulatedCond<FutexEvent>>`
    pub fn with_backend() -> StrandResult<Self> {
        let backend = B::new().map_err(|e| {
            kerror!("condition variable creation failed: {}", e);
            e
        })?;
        Ok(Self { backend })
    }

    /// Block until signaled
    pub fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        // Safety: the guard proves this thread holds the lock
        unsafe { self.backend.wait(guard.raw(), None) };
    }

    /// Block until signaled or `timeout` elapses; `false` on timeout
    pub fn wait_timeout<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>, timeout: Duration) -> bool {
        // Safety: the guard proves this thread holds the lock
        unsafe { self.backend.wait(guard.raw(), Some(timeout)) }
    }

    /// `wait_timeout` with the timeout in microseconds
    pub fn wait_timeout_us<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>, us: u64) -> bool {
        self.wait_timeout(guard, Duration::from_micros(us))
    }

    pub fn signal(&self) {
        self.backend.signal();
    }

    pub fn broadcast(&self) {
        self.backend.broadcast();
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
