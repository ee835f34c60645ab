//! pthread mutex

use nix::errno::Errno;
use std::cell::UnsafeCell;
use std::ptr;
use strand_core::{kdebug, SyncError};

/// Boxed `pthread_mutex_t`
///
/// pthread objects must not move after init, hence the box.
pub struct RawMutex {
    inner: Box<UnsafeCell<libc::pthread_mutex_t>>,
}

// Safety: pthread mutexes are designed for cross-thread use
unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    pub fn new() -> Result<Self, SyncError> {
        let inner = Box::new(UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER));
        let rc = unsafe { libc::pthread_mutex_init(inner.get(), ptr::null()) };
        if rc != 0 {
            kdebug!("pthread_mutex_init: {}", Errno::from_raw(rc));
            return Err(SyncError::MutexInit(rc));
        }
        Ok(Self { inner })
    }

    #[inline]
    pub fn lock(&self) {
        let rc = unsafe { libc::pthread_mutex_lock(self.inner.get()) };
        debug_assert_eq!(rc, 0, "pthread_mutex_lock");
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        unsafe { libc::pthread_mutex_trylock(self.inner.get()) == 0 }
    }

    #[inline]
    pub fn unlock(&self) {
        let rc = unsafe { libc::pthread_mutex_unlock(self.inner.get()) };
        debug_assert_eq!(rc, 0, "pthread_mutex_unlock");
    }

    pub(crate) fn as_ptr(&self) -> *mut libc::pthread_mutex_t {
        self.inner.get()
    }
}

impl Drop for RawMutex {
    fn drop(&mut self) {
        unsafe { libc::pthread_mutex_destroy(self.inner.get()) };
    }
}
