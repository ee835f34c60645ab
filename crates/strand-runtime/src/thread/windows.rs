//! Win32 threads

use std::ffi::c_void;
use std::ptr;
use strand_core::ThreadError;
use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::System::Threading::{
    CreateThread, GetCurrentThreadId, GetThreadId, WaitForSingleObject, INFINITE,
};

unsafe extern "system" fn trampoline(data: *mut c_void) -> u32 {
    super::run_start(data);
    0
}

pub(super) struct NativeThread {
    handle: HANDLE,
}

fn last_error() -> i32 {
    unsafe { GetLastError() as i32 }
}

impl NativeThread {
    /// # Safety
    ///
    /// `data` must be a leaked `ThreadStart` that nothing else will free
    /// if this returns `Ok`.
    pub(super) unsafe fn spawn(data: *mut c_void, stack_size: usize) -> Result<Self, ThreadError> {
        let handle = CreateThread(
            ptr::null(),
            stack_size,
            Some(trampoline),
            data,
            0,
            ptr::null_mut(),
        );
        if handle == 0 {
            return Err(ThreadError::SpawnFailed(last_error()));
        }
        Ok(Self { handle })
    }

    pub(super) fn join(self) -> Result<(), ThreadError> {
        let rc = unsafe { WaitForSingleObject(self.handle, INFINITE) };
        let result = if rc == WAIT_OBJECT_0 {
            Ok(())
        } else {
            Err(ThreadError::JoinFailed(last_error()))
        };
        unsafe { CloseHandle(self.handle) };
        result
    }

    pub(super) fn detach(self) -> Result<(), ThreadError> {
        if unsafe { CloseHandle(self.handle) } == 0 {
            return Err(ThreadError::DetachFailed(last_error()));
        }
        Ok(())
    }

    pub(super) fn is_current(&self) -> bool {
        unsafe { GetThreadId(self.handle) == GetCurrentThreadId() }
    }
}
