//! Native threads
//!
//! Thin wrapper over the OS thread API. The closure travels to the new
//! thread in a heap record; the thread entry trampoline unpacks it, runs it
//! and frees the record. A panic inside the closure is caught and logged so
//! it never unwinds across the OS entry point.
//!
//! A `Thread` handle is either joined, detached, or detached on drop.

use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use strand_core::constants::MIN_THREAD_STACK_SIZE;
use strand_core::{kdebug, kerror, StrandResult};

use crate::config;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use self::unix as sys;
    } else if #[cfg(windows)] {
        mod windows;
        use self::windows as sys;
    }
}

/// Heap record handed to the new thread
struct ThreadStart {
    main: Box<dyn FnOnce() + Send + 'static>,
}

/// Runs first on every spawned thread
///
/// Takes back ownership of the `ThreadStart` leaked by `Builder::spawn`.
fn run_start(data: *mut c_void) {
    // Safety: `data` is the record leaked by spawn, delivered exactly once
    let start = unsafe { Box::from_raw(data as *mut ThreadStart) };
    let ThreadStart { main } = *start;
    if panic::catch_unwind(AssertUnwindSafe(main)).is_err() {
        kerror!("thread closure panicked");
    }
}

/// Thread spawn configuration
#[derive(Debug, Clone)]
pub struct Builder {
    stack_size: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Start from the configured thread stack size
    pub fn new() -> Self {
        Self {
            stack_size: config::global().thread_stack_size,
        }
    }

    /// Stack size in bytes; 0 keeps the platform default
    ///
    /// Non-zero sizes are raised to `MIN_THREAD_STACK_SIZE` and rounded up
    /// to a multiple of it, which satisfies page-size requirements.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    fn effective_stack_size(&self) -> usize {
        match self.stack_size {
            0 => 0,
            n => n
                .max(MIN_THREAD_STACK_SIZE)
                .div_ceil(MIN_THREAD_STACK_SIZE)
                .saturating_mul(MIN_THREAD_STACK_SIZE),
        }
    }

    /// Start a native thread running `f`
    pub fn spawn<F>(self, f: F) -> StrandResult<Thread>
    where
        F: FnOnce() + Send + 'static,
    {
        let record = Box::into_raw(Box::new(ThreadStart { main: Box::new(f) }));
        let stack_size = self.effective_stack_size();

        // Safety: the record stays valid until the new thread reclaims it
        match unsafe { sys::NativeThread::spawn(record as *mut c_void, stack_size) } {
            Ok(native) => {
                kdebug!("spawned thread (stack {})", stack_size);
                Ok(Thread {
                    native: Some(native),
                })
            }
            Err(e) => {
                // No thread started, so the record is still ours
                drop(unsafe { Box::from_raw(record) });
                kerror!("{}", e);
                Err(e.into())
            }
        }
    }
}

/// Handle to a running native thread
pub struct Thread {
    native: Option<sys::NativeThread>,
}

// Safety: the native id/handle may be joined or compared from any thread
unsafe impl Send for Thread {}
unsafe impl Sync for Thread {}

impl Thread {
    /// Spawn with default settings
    pub fn spawn<F>(f: F) -> StrandResult<Thread>
    where
        F: FnOnce() + Send + 'static,
    {
        Builder::new().spawn(f)
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Wait for the thread to finish
    pub fn join(mut self) -> StrandResult<()> {
        match self.native.take() {
            Some(native) => native.join().map_err(|e| {
                kerror!("{}", e);
                e.into()
            }),
            None => Ok(()),
        }
    }

    /// Let the thread run on its own; its resources are freed when it ends
    pub fn detach(mut self) -> StrandResult<()> {
        match self.native.take() {
            Some(native) => native.detach().map_err(Into::into),
            None => Ok(()),
        }
    }

    /// Whether the calling thread is this one
    pub fn is_current(&self) -> bool {
        self.native.as_ref().is_some_and(sys::NativeThread::is_current)
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if let Some(native) = self.native.take() {
            if let Err(e) = native.detach() {
                kdebug!("detach on drop: {}", e);
            }
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("current", &self.is_current())
            .finish()
    }
}

/// Whether the calling thread is `thread`; `None` is never the caller
pub fn is_self(thread: Option<&Thread>) -> bool {
    thread.is_some_and(Thread::is_current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn test_join_waits_for_completion() {
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        let t = Thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            d.store(1, Ordering::SeqCst);
        })
        .unwrap();
        t.join().unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_many_threads() {
        let count = Arc::new(AtomicUsize::new(0));
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let c = Arc::clone(&count);
                Thread::spawn(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_detached_thread_runs() {
        let (tx, rx) = mpsc::channel();
        let t = Thread::spawn(move || {
            tx.send(42).unwrap();
        })
        .unwrap();
        t.detach().unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_is_self() {
        assert!(!is_self(None));

        let (tx, rx) = mpsc::channel::<Arc<Thread>>();
        let (back, result) = mpsc::channel();
        let t = Arc::new(
            Thread::spawn(move || {
                let me = rx.recv().unwrap();
                back.send(is_self(Some(&me))).unwrap();
            })
            .unwrap(),
        );
        assert!(!t.is_current());
        tx.send(Arc::clone(&t)).unwrap();
        assert!(result.recv().unwrap());
    }

    #[test]
    fn test_panic_is_contained() {
        let t = Thread::spawn(|| panic!("boom")).unwrap();
        assert!(t.join().is_ok());
    }

    #[test]
    fn test_spawn_failure_releases_closure() {
        let token = Arc::new(());
        let held = Arc::clone(&token);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let result = Builder::new().stack_size(usize::MAX / 4).spawn(move || {
            let _held = held;
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert!(result.is_err());
        // The closure was dropped unrun along with its start record
        assert_eq!(Arc::strong_count(&token), 1);
        assert_eq!(Arc::strong_count(&ran), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_custom_stack_size() {
        let b = Builder::new().stack_size(100);
        assert_eq!(b.effective_stack_size(), MIN_THREAD_STACK_SIZE);
        let b = Builder::new().stack_size(MIN_THREAD_STACK_SIZE + 1);
        assert_eq!(b.effective_stack_size(), 2 * MIN_THREAD_STACK_SIZE);
        assert_eq!(Builder::new().stack_size(0).effective_stack_size(), 0);

        let (tx, rx) = mpsc::channel();
        let t = Builder::new()
            .stack_size(512 * 1024)
            .spawn(move || {
                // Deep enough to need more than a minimal stack
                let buf = [7u8; 256 * 1024];
                tx.send(std::hint::black_box(&buf).iter().map(|&b| b as usize).sum::<usize>())
                    .unwrap();
            })
            .unwrap();
        t.join().unwrap();
        assert_eq!(rx.recv().unwrap(), 7 * 256 * 1024);
    }
}
