//! pthread condition variable
//!
//! Timed waits use CLOCK_MONOTONIC so wall-clock jumps don't stretch or cut
//! them short. Apple platforms lack `pthread_condattr_setclock` and fall
//! back to CLOCK_REALTIME.

use super::CondBackend;
use crate::mutex::RawMutex;
use nix::errno::Errno;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::time::Duration;
use strand_core::{kdebug, StrandResult, SyncError};

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
const WAIT_CLOCK: libc::clockid_t = libc::CLOCK_MONOTONIC;
#[cfg(any(target_os = "macos", target_os = "ios"))]
const WAIT_CLOCK: libc::clockid_t = libc::CLOCK_REALTIME;

/// Boxed `pthread_cond_t`
pub struct NativeCond {
    inner: Box<UnsafeCell<libc::pthread_cond_t>>,
}

// Safety: pthread condition variables are designed for cross-thread use
unsafe impl Send for NativeCond {}
unsafe impl Sync for NativeCond {}

impl NativeCond {
    fn init(cond: *mut libc::pthread_cond_t) -> Result<(), SyncError> {
        let mut attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
        unsafe {
            let rc = libc::pthread_condattr_init(attr.as_mut_ptr());
            if rc != 0 {
                return Err(SyncError::CondInit(rc));
            }
            #[cfg(not(any(target_os = "macos", target_os = "ios")))]
            {
                let rc = libc::pthread_condattr_setclock(attr.as_mut_ptr(), WAIT_CLOCK);
                if rc != 0 {
                    libc::pthread_condattr_destroy(attr.as_mut_ptr());
                    return Err(SyncError::CondInit(rc));
                }
            }
            let rc = libc::pthread_cond_init(cond, attr.as_ptr());
            libc::pthread_condattr_destroy(attr.as_mut_ptr());
            if rc != 0 {
                return Err(SyncError::CondInit(rc));
            }
        }
        Ok(())
    }
}

impl CondBackend for NativeCond {
    fn new() -> StrandResult<Self> {
        let inner = Box::new(UnsafeCell::new(libc::PTHREAD_COND_INITIALIZER));
        Self::init(inner.get()).map_err(|e| {
            if let SyncError::CondInit(rc) = e {
                kdebug!("pthread_cond_init: {}", Errno::from_raw(rc));
            }
            e
        })?;
        Ok(Self { inner })
    }

    unsafe fn wait(&self, lock: &RawMutex, timeout: Option<Duration>) -> bool {
        match timeout {
            None => {
                libc::pthread_cond_wait(self.inner.get(), lock.as_ptr());
                true
            }
            Some(d) => {
                let at = deadline_timespec(d);
                let rc = libc::pthread_cond_timedwait(self.inner.get(), lock.as_ptr(), &at);
                rc == 0
            }
        }
    }

    fn signal(&self) {
        unsafe { libc::pthread_cond_signal(self.inner.get()) };
    }

    fn broadcast(&self) {
        unsafe { libc::pthread_cond_broadcast(self.inner.get()) };
    }
}

impl Drop for NativeCond {
    fn drop(&mut self) {
        unsafe { libc::pthread_cond_destroy(self.inner.get()) };
    }
}

/// Absolute `WAIT_CLOCK` time `d` from now, saturating at the clock's end
fn deadline_timespec(d: Duration) -> libc::timespec {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe { libc::clock_gettime(WAIT_CLOCK, &mut now) };

    let mut sec = (now.tv_sec as i64).saturating_add(d.as_secs().min(i64::MAX as u64) as i64);
    let mut nsec = now.tv_nsec as i64 + d.subsec_nanos() as i64;
    if nsec >= 1_000_000_000 {
        nsec -= 1_000_000_000;
        sec = sec.saturating_add(1);
    }
    libc::timespec {
        tv_sec: sec.min(libc::time_t::MAX as i64) as libc::time_t,
        tv_nsec: nsec as libc::c_long,
    }
}
