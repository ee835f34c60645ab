//! Kernel mutex object
//!
//! Windows mutexes are recursive; `Mutex` never relies on that.

use std::ptr;
use strand_core::SyncError;
use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::System::Threading::{
    CreateMutexW, ReleaseMutex, WaitForSingleObject, INFINITE,
};

pub struct RawMutex {
    handle: HANDLE,
}

// Safety: mutex handles may be used from any thread
unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    pub fn new() -> Result<Self, SyncError> {
        let handle = unsafe { CreateMutexW(ptr::null(), 0, ptr::null()) };
        if handle == 0 {
            return Err(SyncError::MutexInit(unsafe { GetLastError() } as i32));
        }
        Ok(Self { handle })
    }

    #[inline]
    pub fn lock(&self) {
        let rc = unsafe { WaitForSingleObject(self.handle, INFINITE) };
        debug_assert_eq!(rc, WAIT_OBJECT_0, "WaitForSingleObject(mutex)");
    }

    #[inline]
    pub fn try_lock(&self) -> bool {
        unsafe { WaitForSingleObject(self.handle, 0) == WAIT_OBJECT_0 }
    }

    #[inline]
    pub fn unlock(&self) {
        unsafe { ReleaseMutex(self.handle) };
    }
}

impl Drop for RawMutex {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.handle) };
    }
}
