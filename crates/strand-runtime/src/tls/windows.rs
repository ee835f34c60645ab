//! Win32 TLS indices

use std::ffi::c_void;
use strand_core::TlsError;
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::System::Threading::{
    TlsAlloc, TlsFree, TlsGetValue, TlsSetValue, TLS_OUT_OF_INDEXES,
};

#[derive(Debug, Clone, Copy)]
pub(super) struct NativeKey(u32);

impl NativeKey {
    pub(super) fn create() -> Result<Self, TlsError> {
        let index = unsafe { TlsAlloc() };
        if index == TLS_OUT_OF_INDEXES {
            return Err(TlsError::CreateFailed(unsafe { GetLastError() } as i32));
        }
        Ok(Self(index))
    }

    #[inline]
    pub(super) fn get(self) -> *mut c_void {
        unsafe { TlsGetValue(self.0) }
    }

    #[inline]
    pub(super) fn set(self, value: *mut c_void) -> Result<(), TlsError> {
        if unsafe { TlsSetValue(self.0, value) } == 0 {
            return Err(TlsError::SetFailed(unsafe { GetLastError() } as i32));
        }
        Ok(())
    }

    pub(super) fn delete(self) -> Result<(), TlsError> {
        if unsafe { TlsFree(self.0) } == 0 {
            return Err(TlsError::DeleteFailed(unsafe { GetLastError() } as i32));
        }
        Ok(())
    }
}
