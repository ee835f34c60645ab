//! Context engine
//!
//! A `Context` is a suspended (or the running) execution state: a save area
//! plus, for created contexts, the stack that follows it in the same block.
//! Every OS thread has exactly one active context at a time. The first call
//! to `active()` on a thread names the thread's own stack, the home context,
//! which lives in thread-local storage and is never freed.
//!
//! Switching is cooperative and strictly per thread: `switch_to` saves the
//! running registers into the active context and resumes the target. A
//! context may be resumed on a different thread than the one it was created
//! on, but never on two threads at once.

use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ptr::NonNull;

use strand_core::constants::MIN_STACK_SIZE;
use strand_core::layout::{RegisterLayout, SaveArea};
use strand_core::{kdebug, kerror, ktrace, ContextBackend, MemoryError, StrandResult};

use crate::arch::{self, CurrentBackend};
use crate::config;
use crate::memory;

const LAYOUT: &RegisterLayout = <CurrentBackend as ContextBackend>::LAYOUT;

/// Entry point of a created context
///
/// Runs on the context's own stack with nothing below it, so it must never
/// return; it ends by switching away for good.
pub type EntryFn = extern "C" fn() -> !;

#[repr(C, align(64))]
struct HomeArea([u8; LAYOUT.save_area_size]);

thread_local! {
    static HOME: UnsafeCell<HomeArea> =
        const { UnsafeCell::new(HomeArea([0; LAYOUT.save_area_size])) };
    static ACTIVE: Cell<Option<Context>> = const { Cell::new(None) };
}

/// Handle to one execution context
///
/// A plain copyable handle; ownership of the memory is by convention: the
/// creator calls `delete` exactly once, while the context is suspended.
/// A suspended context may be resumed on another thread; see `switch_to`
/// for what that means for thread-local access.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Context {
    base: NonNull<u8>,
    // Block length; 0 marks a thread's home context
    len: usize,
}

// Safety: a suspended context is plain memory; the engine never runs one
// on two threads because a context is only entered by `switch_to`.
unsafe impl Send for Context {}

impl Context {
    /// Create a suspended context that runs `entry` when first switched to
    ///
    /// Stack sizes below `MIN_STACK_SIZE` are raised to it.
    pub fn new(stack_size: usize, entry: EntryFn) -> StrandResult<Context> {
        let stack = if stack_size < MIN_STACK_SIZE {
            kdebug!("context stack {} raised to {}", stack_size, MIN_STACK_SIZE);
            MIN_STACK_SIZE
        } else {
            stack_size
        };
        let len = LAYOUT
            .block_size(stack)
            .ok_or(MemoryError::SizeOverflow(stack_size))?;
        let base = memory::alloc_block(len, LAYOUT.block_align).map_err(|e| {
            kerror!("context allocation failed: {}", e);
            e
        })?;

        // Safety: fresh block of `len` bytes aligned to block_align
        unsafe { arch::init_block::<CurrentBackend>(base.as_ptr(), len, entry as usize) };

        let ctx = Context { base, len };
        kdebug!("created {:?} ({} stack)", ctx, LAYOUT.name);
        Ok(ctx)
    }

    /// Create with the configured default stack size
    pub fn with_default_stack(entry: EntryFn) -> StrandResult<Context> {
        Self::new(config::global().context_stack_size, entry)
    }

    /// Whether this is some thread's home context
    #[inline]
    pub fn is_home(&self) -> bool {
        self.len == 0
    }

    /// Stack region `[lo, hi)` of a created context; `None` for home
    pub fn stack_bounds(&self) -> Option<(usize, usize)> {
        if self.is_home() {
            return None;
        }
        Some(LAYOUT.stack_region(self.base.as_ptr() as usize, self.len))
    }

    /// Stack pointer recorded by the last switch away (or the initial one)
    ///
    /// Stale while the context is running.
    pub fn saved_stack_pointer(&self) -> usize {
        self.save_area().stack_pointer()
    }

    /// Address the context resumes at
    pub fn saved_return_address(&self) -> usize {
        self.save_area().return_address()
    }

    fn save_area(&self) -> SaveArea<'_> {
        // Safety: every context starts with a save area of the backend size
        unsafe { SaveArea::from_raw(self.base.as_ptr(), LAYOUT) }
    }

    /// Release a created context
    ///
    /// # Safety
    ///
    /// The context must be suspended, not the home context, and must never
    /// be switched to again.
    pub unsafe fn delete(self) {
        debug_assert!(!self.is_home(), "home context cannot be deleted");
        debug_assert!(active() != self, "deleting the active context");
        kdebug!("deleting {:?}", self);
        memory::free_block(self.base);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_home() {
            write!(f, "Context(home@{:p})", self.base)
        } else {
            write!(f, "Context({:p}, {} bytes)", self.base, self.len)
        }
    }
}

/// The context currently running on this thread
///
/// The first call on a thread names the thread's own stack; the returned
/// handle is stable until the thread switches elsewhere.
#[inline(never)]
pub fn active() -> Context {
    ACTIVE.with(|active| match active.get() {
        Some(ctx) => ctx,
        None => {
            let home = HOME.with(|h| h.get() as *mut u8);
            // Safety: address of a live thread-local, never null
            let ctx = Context {
                base: unsafe { NonNull::new_unchecked(home) },
                len: 0,
            };
            active.set(Some(ctx));
            ctx
        }
    })
}

/// Suspend the running context and resume `target`
///
/// Returns when some later `switch_to` names the context that was running
/// here. Switching to the active context is a no-op.
///
/// # Safety
///
/// `target` must be live (not deleted), must not be running on any thread,
/// and must have been created by `Context::new` or captured by `active()`.
///
/// If the calling context can be resumed on a different OS thread than the
/// one it suspended on, it must not keep references into `thread_local!`
/// storage across this call. The compiler may reuse a thread-local address
/// computed before the switch, so such a reference would still point at the
/// previous thread's value. Re-enter thread-locals through a fresh
/// `with` call after the switch returns and leave values cached from before
/// the switch alone.
// Out of line: `ACTIVE` must be resolved on the thread doing the switch.
#[inline(never)]
pub unsafe fn switch_to(target: Context) {
    let current = active();
    if current == target {
        return;
    }
    ACTIVE.with(|active| active.set(Some(target)));
    ktrace!("switch {:?} -> {:?}", current, target);
    CurrentBackend::swap(current.base.as_ptr(), target.base.as_ptr());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::thread;

    struct Ring {
        members: Vec<Context>,
        home: Option<Context>,
        laps: usize,
        laps_done: usize,
        visits: usize,
        mismatches: usize,
    }

    thread_local! {
        static RING: RefCell<Option<Ring>> = const { RefCell::new(None) };
    }

    extern "C" fn ring_member() -> ! {
        loop {
            let next = RING.with(|r| {
                let mut r = r.borrow_mut();
                let r = r.as_mut().unwrap();
                let me = active();
                let idx = match r.members.iter().position(|c| *c == me) {
                    Some(idx) => idx,
                    None => {
                        r.mismatches += 1;
                        return r.home.unwrap();
                    }
                };
                r.visits += 1;
                if idx + 1 < r.members.len() {
                    return r.members[idx + 1];
                }
                r.laps_done += 1;
                if r.laps_done == r.laps {
                    r.home.unwrap()
                } else {
                    r.members[0]
                }
            });
            unsafe { switch_to(next) };
        }
    }

    fn run_ring(n: usize, laps: usize) -> (usize, usize) {
        let members: Vec<_> = (0..n)
            .map(|_| Context::new(64 * 1024, ring_member).unwrap())
            .collect();
        let home = active();
        assert!(home.is_home());

        RING.with(|r| {
            *r.borrow_mut() = Some(Ring {
                members: members.clone(),
                home: Some(home),
                laps,
                laps_done: 0,
                visits: 0,
                mismatches: 0,
            })
        });

        unsafe { switch_to(members[0]) };
        assert_eq!(active(), home);

        let ring = RING.with(|r| r.borrow_mut().take().unwrap());
        for ctx in members {
            unsafe { ctx.delete() };
        }
        (ring.visits, ring.mismatches)
    }

    #[test]
    fn test_ring_handoff_counts() {
        let (visits, mismatches) = run_ring(4, 25);
        assert_eq!(visits, 4 * 25);
        assert_eq!(mismatches, 0);
    }

    #[test]
    fn test_rings_on_parallel_threads() {
        let handles: Vec<_> = (0..4)
            .map(|i| thread::spawn(move || run_ring(2 + i, 10)))
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), ((2 + i) * 10, 0));
        }
    }

    #[test]
    fn test_home_is_stable_and_per_thread() {
        let a = active();
        let b = active();
        assert_eq!(a, b);
        assert!(a.is_home());
        assert_eq!(a.stack_bounds(), None);

        let other = thread::spawn(|| {
            let ctx = active();
            (ctx.base.as_ptr() as usize, ctx.is_home())
        })
        .join()
        .unwrap();
        assert!(other.1);
        assert_ne!(other.0, a.base.as_ptr() as usize);
    }

    #[test]
    fn test_switch_to_self_is_noop() {
        let home = active();
        unsafe { switch_to(home) };
        assert_eq!(active(), home);
    }

    extern "C" fn never_run() -> ! {
        loop {
            std::hint::spin_loop();
        }
    }

    #[test]
    fn test_fresh_context_state() {
        let ctx = Context::new(100, never_run).unwrap();
        let (lo, hi) = ctx.stack_bounds().unwrap();
        assert!(hi - lo >= MIN_STACK_SIZE);

        let sp = ctx.saved_stack_pointer();
        assert!(sp > lo && sp < hi);
        assert_eq!((sp + LAYOUT.entry_bias) % LAYOUT.stack_align, 0);
        assert_eq!(ctx.saved_return_address(), never_run as usize);
        assert_eq!(ctx.base.as_ptr() as usize % LAYOUT.block_align, 0);
        unsafe { ctx.delete() };
    }

    #[test]
    fn test_oversized_stack_fails() {
        assert!(Context::new(usize::MAX, never_run).is_err());
        assert!(Context::new(usize::MAX / 2, never_run).is_err());
    }

    // Callee-saved registers must survive a round trip through another
    // context that clobbers them.
    thread_local! {
        static PEER: Cell<Option<(Context, Context)>> = const { Cell::new(None) };
    }

    extern "C" fn clobber() -> ! {
        loop {
            let mut acc = 0u64;
            let mut f = 1.5f64;
            for i in 0..64u64 {
                acc = acc.wrapping_mul(31).wrapping_add(i);
                f = f * 1.0001 + i as f64;
            }
            std::hint::black_box((acc, f));
            let (home, me) = PEER.with(|p| p.get()).unwrap();
            debug_assert_eq!(active(), me);
            unsafe { switch_to(home) };
        }
    }

    #[test]
    fn test_values_survive_switches() {
        let peer = Context::new(32 * 1024, clobber).unwrap();
        PEER.with(|p| p.set(Some((active(), peer))));

        let mut sum = 0u64;
        let mut x = 0.25f64;
        for i in 0..100u64 {
            sum = std::hint::black_box(sum + i);
            x = std::hint::black_box(x * 2.0);
            unsafe { switch_to(peer) };
            x /= 2.0;
        }
        assert_eq!(sum, 4950);
        assert_eq!(x, 0.25);
        unsafe { peer.delete() };
    }

    #[test]
    fn test_context_resumes_on_another_thread() {
        let peer = Context::new(32 * 1024, clobber).unwrap();
        let handle = thread::spawn(move || {
            PEER.with(|p| p.set(Some((active(), peer))));
            for _ in 0..3 {
                unsafe { switch_to(peer) };
            }
            active().is_home()
        });
        assert!(handle.join().unwrap());
        unsafe { peer.delete() };
    }

    // Started on one thread, resumed on others; reads the engine state
    // through a fresh call after every switch.
    static MIGRANT_BACK: std::sync::Mutex<Option<Context>> = std::sync::Mutex::new(None);
    static MIGRANT_SEEN: std::sync::Mutex<Vec<Context>> = std::sync::Mutex::new(Vec::new());

    #[inline(never)]
    fn migrant_step() -> Context {
        MIGRANT_SEEN.lock().unwrap().push(active());
        MIGRANT_BACK.lock().unwrap().take().unwrap()
    }

    extern "C" fn migrant() -> ! {
        loop {
            let back = migrant_step();
            unsafe { switch_to(back) };
        }
    }

    #[test]
    fn test_suspended_context_migrates_between_threads() {
        let peer = Context::new(32 * 1024, migrant).unwrap();
        let visit = move || {
            let home = active();
            *MIGRANT_BACK.lock().unwrap() = Some(home);
            unsafe { switch_to(peer) };
            active() == home
        };

        assert!(visit());
        for _ in 0..3 {
            assert!(thread::spawn(visit).join().unwrap());
        }
        let seen = MIGRANT_SEEN.lock().unwrap().clone();
        assert_eq!(seen, vec![peer; 4]);
        unsafe { peer.delete() };
    }
}
