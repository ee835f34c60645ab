//! # strand - portable concurrency substrate
//!
//! Two layers that programs such as emulators and media frontends build on:
//!
//! - **Contexts**: user-space coroutines with their own stacks, switched
//!   cooperatively by hand-written assembly (x86_64, aarch64, riscv64)
//! - **Threads**: native threads, mutexes, condition variables and
//!   thread-local slots over pthreads or Win32
//!
//! ## Quick Start
//!
//! ```ignore
//! use strand::{active, switch_to, Context};
//! use std::cell::Cell;
//!
//! thread_local!(static MAIN: Cell<Option<Context>> = Cell::new(None));
//!
//! extern "C" fn worker() -> ! {
//!     loop {
//!         println!("in coroutine");
//!         unsafe { switch_to(MAIN.with(|m| m.get()).unwrap()) };
//!     }
//! }
//!
//! fn main() {
//!     MAIN.with(|m| m.set(Some(active())));
//!     let co = Context::new(64 * 1024, worker).unwrap();
//!     unsafe { switch_to(co) };
//!     println!("back in main");
//!     unsafe { co.delete() };
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      User Code                              │
//! │      Context::new / switch_to     Thread / Mutex / Condvar  │
//! └─────────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼                              ▼
//!    ┌───────────────────────┐      ┌───────────────────────────┐
//!    │    Context engine     │      │  Native sync primitives   │
//!    │ active ptr, home area │      │ pthread / Win32, FIFO     │
//!    └───────────────────────┘      │ emulated condvar          │
//!                │                  └───────────────────────────┘
//!                ▼
//!    ┌───────────────────────┐
//!    │  Arch backend (asm)   │
//!    │ save area + swap      │
//!    └───────────────────────┘
//! ```
//!
//! The flat `context_*`, `thread_*`, `mutex_*`, `cond_*` and `tls_*`
//! functions mirror the type methods for callers that prefer free
//! functions.

use std::ffi::c_void;

// Re-export core types
pub use strand_core::{
    ConfigError, MemoryError, RegisterLayout, StrandError, StrandResult, SyncError, ThreadError,
    TlsError,
};

// Re-export kprint macros for debug logging
pub use strand_core::{kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use strand_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use strand_core::{env_get, env_get_bool, env_get_opt};

// Re-export runtime types
pub use strand_runtime::{
    active, is_self, switch_to, BinaryEvent, Builder, CondBackend, Condvar, Context,
    EmulatedCond, EntryFn, FallbackEvent, Mutex, MutexGuard, PlatformCond, PlatformEvent,
    RuntimeConfig, Thread, TlsSlot,
};
#[cfg(unix)]
pub use strand_runtime::NativeCond;
pub use strand_runtime::config;

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// Create a suspended context running `entry` on a `stack_size` stack
pub fn context_create(stack_size: usize, entry: EntryFn) -> StrandResult<Context> {
    Context::new(stack_size, entry)
}

/// The context running on this thread
pub fn context_active() -> Context {
    active()
}

/// Suspend the running context and resume `target`
///
/// # Safety
///
/// Same contract as [`switch_to`].
pub unsafe fn context_switch(target: Context) {
    switch_to(target)
}

/// Free a suspended context
///
/// # Safety
///
/// Same contract as [`Context::delete`].
pub unsafe fn context_delete(ctx: Context) {
    ctx.delete()
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

pub fn thread_spawn<F>(f: F) -> StrandResult<Thread>
where
    F: FnOnce() + Send + 'static,
{
    Thread::spawn(f)
}

pub fn thread_join(thread: Thread) -> StrandResult<()> {
    thread.join()
}

pub fn thread_detach(thread: Thread) -> StrandResult<()> {
    thread.detach()
}

/// Whether the caller is `thread`; `None` never matches
pub fn thread_is_self(thread: Option<&Thread>) -> bool {
    is_self(thread)
}

// ---------------------------------------------------------------------------
// Mutexes and condition variables
// ---------------------------------------------------------------------------

pub fn mutex_new() -> StrandResult<Mutex> {
    Mutex::new(())
}

/// Destroy the native lock; the same as dropping `mutex`
pub fn mutex_free(mutex: Mutex) {
    drop(mutex);
}

pub fn mutex_lock(mutex: &Mutex) -> MutexGuard<'_, ()> {
    mutex.lock()
}

pub fn mutex_unlock(guard: MutexGuard<'_, ()>) {
    drop(guard);
}

pub fn cond_new() -> StrandResult<Condvar> {
    Condvar::new()
}

/// Destroy the condition variable; the same as dropping `cond`
pub fn cond_free(cond: Condvar) {
    drop(cond);
}

pub fn cond_wait<T: ?Sized>(cond: &Condvar, guard: &mut MutexGuard<'_, T>) {
    cond.wait(guard)
}

/// Wait at most `timeout_us` microseconds; `false` on timeout
pub fn cond_wait_timeout<T: ?Sized>(cond: &Condvar, guard: &mut MutexGuard<'_, T>, timeout_us: u64) -> bool {
    cond.wait_timeout_us(guard, timeout_us)
}

pub fn cond_signal(cond: &Condvar) {
    cond.signal()
}

pub fn cond_broadcast(cond: &Condvar) {
    cond.broadcast()
}

// ---------------------------------------------------------------------------
// Thread-local slots
// ---------------------------------------------------------------------------

pub fn tls_create() -> StrandResult<TlsSlot> {
    TlsSlot::new()
}

pub fn tls_delete(slot: TlsSlot) -> StrandResult<()> {
    slot.delete()
}

pub fn tls_get(slot: &TlsSlot) -> *mut c_void {
    slot.get()
}

pub fn tls_set(slot: &TlsSlot, value: *mut c_void) -> StrandResult<()> {
    slot.set(value)
}
