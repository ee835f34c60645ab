//! Native mutex
//!
//! `Mutex<T>` owns an OS lock and the data it protects. Locking yields a
//! `MutexGuard`, which is also how condition variables prove the lock is
//! held. Creation failures surface as errors; a `Mutex` that exists is
//! always usable.
//!
//! - Unix: `pthread_mutex_t`, boxed so its address never moves
//! - Windows: kernel mutex object

use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use strand_core::{kerror, StrandResult};

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use self::unix::RawMutex;
    } else if #[cfg(windows)] {
        mod windows;
        pub use self::windows::RawMutex;
    }
}

/// Mutual exclusion around a `T`
pub struct Mutex<T: ?Sized = ()> {
    raw: RawMutex,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `raw`
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub fn new(value: T) -> StrandResult<Self> {
        let raw = RawMutex::new().map_err(|e| {
            kerror!("mutex creation failed: {}", e);
            e
        })?;
        Ok(Self {
            raw,
            data: UnsafeCell::new(value),
        })
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Block until the lock is acquired
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.raw.lock();
        MutexGuard {
            mutex: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        if self.raw.try_lock() {
            Some(MutexGuard {
                mutex: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// Acquire without a guard, for lock/unlock split across call sites
    pub fn raw_lock(&self) {
        self.raw.lock();
    }

    /// Release a lock taken with `raw_lock`
    ///
    /// # Safety
    ///
    /// The calling thread must hold the lock and no guard may exist for it.
    pub unsafe fn raw_unlock(&self) {
        self.raw.unlock();
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: ?Sized> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").finish_non_exhaustive()
    }
}

/// Holds the lock until dropped
///
/// Not `Send`: the lock must be released by the thread that took it.
pub struct MutexGuard<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T: ?Sized> MutexGuard<'_, T> {
    pub(crate) fn raw(&self) -> &RawMutex {
        &self.mutex.raw
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: we hold the lock
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: we hold the lock
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.raw.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mutual_exclusion() {
        const THREADS: usize = 8;
        const ITERS: usize = 10_000;

        let m = Arc::new(Mutex::new(0usize).unwrap());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        // Non-atomic read-modify-write; only safe under the lock
                        let mut g = m.lock();
                        let v = *g;
                        std::hint::black_box(&v);
                        *g = v + 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*m.lock(), THREADS * ITERS);
    }

    #[test]
    fn test_try_lock_from_other_thread() {
        let m = Arc::new(Mutex::new(()).unwrap());
        let g = m.lock();
        let m2 = Arc::clone(&m);
        let contended = thread::spawn(move || m2.try_lock().is_none()).join().unwrap();
        assert!(contended);
        drop(g);
        assert!(m.try_lock().is_some());
    }

    #[test]
    fn test_raw_lock_unlock() {
        let m = Mutex::new(5u32).unwrap();
        m.raw_lock();
        unsafe { m.raw_unlock() };
        assert_eq!(*m.lock(), 5);
    }

    #[test]
    fn test_into_inner_and_get_mut() {
        let mut m = Mutex::new(vec![1, 2]).unwrap();
        m.get_mut().push(3);
        assert_eq!(m.into_inner(), vec![1, 2, 3]);
    }
}
