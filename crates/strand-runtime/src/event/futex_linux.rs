//! Linux futex-backed event
//!
//! Futex word semantics:
//! - 0 = unarmed
//! - 1 = armed
//!
//! `set` swaps in 1 and issues FUTEX_WAKE only on a 0 -> 1 transition.
//! `wait` claims the event with a 1 -> 0 CAS and sleeps in FUTEX_WAIT
//! while the word is 0.

use super::{BinaryEvent, Deadline};
use nix::errno::Errno;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use strand_core::{ktrace, StrandResult};

/// Futex-backed auto-reset event
pub struct FutexEvent {
    word: AtomicU32,
}

impl BinaryEvent for FutexEvent {
    fn new() -> StrandResult<Self> {
        Ok(Self {
            word: AtomicU32::new(0),
        })
    }

    fn set(&self) {
        if self.word.swap(1, Ordering::Release) == 0 {
            futex_wake(&self.word);
        }
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = Deadline::after(timeout);
        loop {
            if self.try_acquire() {
                return true;
            }
            let remaining = deadline.remaining();
            if matches!(remaining, Some(d) if d.is_zero()) {
                return false;
            }
            futex_wait(&self.word, remaining);
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.word
            .compare_exchange(1, 0, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

/// Sleep while the word is 0
///
/// Returns on wake, timeout, signal or a changed word; the caller re-checks.
fn futex_wait(word: &AtomicU32, timeout: Option<Duration>) {
    let timespec = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let timespec_ptr = match &timespec {
        Some(ts) => ts as *const libc::timespec,
        None => std::ptr::null(),
    };

    let result = unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
            0u32,
            timespec_ptr,
            std::ptr::null::<u32>(),
            0u32,
        )
    };
    if result != 0 {
        match Errno::last() {
            Errno::ETIMEDOUT | Errno::EAGAIN | Errno::EINTR => {}
            e => ktrace!("futex wait: {}", e),
        }
    }
}

fn futex_wake(word: &AtomicU32) {
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word.as_ptr(),
            libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
            1i32,
            std::ptr::null::<libc::timespec>(),
            std::ptr::null::<u32>(),
            0u32,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::tests::{check_cross_thread_wake, check_latch, check_timeout};

    #[test]
    fn test_futex_event() {
        check_latch::<FutexEvent>();
        check_timeout::<FutexEvent>();
        check_cross_thread_wake::<FutexEvent>();
    }

    #[test]
    fn test_word_states() {
        let ev = FutexEvent::new().unwrap();
        assert_eq!(ev.word.load(Ordering::Relaxed), 0);
        ev.set();
        assert_eq!(ev.word.load(Ordering::Relaxed), 1);
        assert!(ev.wait(None));
        assert_eq!(ev.word.load(Ordering::Relaxed), 0);
    }
}
