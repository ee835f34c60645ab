//! Auto-reset binary events
//!
//! A `BinaryEvent` is a one-bit latch: `set` arms it (waking one blocked
//! waiter if there is one) and a successful `wait` disarms it again. Setting
//! an armed event is a no-op, so wakeups never accumulate beyond one.
//!
//! The emulated condition variable is built from two of these.
//!
//! # Implementations
//!
//! - `FutexEvent` (Linux): one futex word, no allocation
//! - `WinEvent` (Windows): kernel auto-reset event
//! - `FallbackEvent` (everywhere): std `Mutex<bool>` + `Condvar`

use std::time::{Duration, Instant};
use strand_core::StrandResult;

mod fallback;
pub use fallback::FallbackEvent;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod futex_linux;
        pub use futex_linux::FutexEvent;
        /// Best event for this platform
        pub type PlatformEvent = FutexEvent;
    } else if #[cfg(windows)] {
        mod windows;
        pub use self::windows::WinEvent;
        /// Best event for this platform
        pub type PlatformEvent = WinEvent;
    } else {
        /// Best event for this platform
        pub type PlatformEvent = FallbackEvent;
    }
}

/// Auto-reset one-bit event
pub trait BinaryEvent: Send + Sync + Sized {
    /// Create an unarmed event
    fn new() -> StrandResult<Self>;

    /// Arm the event, releasing one current or future waiter
    fn set(&self);

    /// Block until armed, then disarm
    ///
    /// `None` waits forever. Returns `false` if `timeout` elapsed first.
    fn wait(&self, timeout: Option<Duration>) -> bool;

    /// Disarm if armed, without blocking
    fn try_acquire(&self) -> bool {
        self.wait(Some(Duration::ZERO))
    }
}

/// Absolute deadline for a relative timeout
///
/// Timeouts too large to represent are treated as unbounded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub(crate) fn after(timeout: Option<Duration>) -> Self {
        Deadline(timeout.and_then(|t| Instant::now().checked_add(t)))
    }

    /// Time left: `None` when unbounded, zero once expired
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub(crate) fn expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    pub(crate) fn check_latch<E: BinaryEvent>() {
        let ev = E::new().unwrap();
        assert!(!ev.try_acquire());
        ev.set();
        ev.set();
        // Two sets collapse into one
        assert!(ev.try_acquire());
        assert!(!ev.try_acquire());
    }

    pub(crate) fn check_timeout<E: BinaryEvent>() {
        let ev = E::new().unwrap();
        let start = Instant::now();
        assert!(!ev.wait(Some(Duration::from_millis(30))));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    pub(crate) fn check_cross_thread_wake<E: BinaryEvent + 'static>() {
        let ev = Arc::new(E::new().unwrap());
        let waiter = {
            let ev = Arc::clone(&ev);
            thread::spawn(move || ev.wait(Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(20));
        ev.set();
        assert!(waiter.join().unwrap());
        assert!(!ev.try_acquire());
    }

    #[test]
    fn test_platform_event() {
        check_latch::<PlatformEvent>();
        check_timeout::<PlatformEvent>();
        check_cross_thread_wake::<PlatformEvent>();
    }

    #[test]
    fn test_deadline() {
        assert_eq!(Deadline::after(None).remaining(), None);
        assert!(!Deadline::after(None).expired());
        assert!(Deadline::after(Some(Duration::ZERO)).expired());
        assert!(!Deadline::after(Some(Duration::MAX)).expired());

        let d = Deadline::after(Some(Duration::from_secs(60)));
        let left = d.remaining().unwrap();
        assert!(left > Duration::from_secs(59) && left <= Duration::from_secs(60));
    }
}
