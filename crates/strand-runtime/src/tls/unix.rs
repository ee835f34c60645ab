//! pthread keys

use nix::errno::Errno;
use std::ffi::c_void;
use strand_core::TlsError;

#[derive(Debug, Clone, Copy)]
pub(super) struct NativeKey(libc::pthread_key_t);

impl NativeKey {
    pub(super) fn create() -> Result<Self, TlsError> {
        let mut key: libc::pthread_key_t = 0;
        let rc = unsafe { libc::pthread_key_create(&mut key, None) };
        if rc != 0 {
            strand_core::kdebug!("pthread_key_create: {}", Errno::from_raw(rc));
            return Err(TlsError::CreateFailed(rc));
        }
        Ok(Self(key))
    }

    #[inline]
    pub(super) fn get(self) -> *mut c_void {
        unsafe { libc::pthread_getspecific(self.0) }
    }

    #[inline]
    pub(super) fn set(self, value: *mut c_void) -> Result<(), TlsError> {
        let rc = unsafe { libc::pthread_setspecific(self.0, value) };
        if rc != 0 {
            return Err(TlsError::SetFailed(rc));
        }
        Ok(())
    }

    pub(super) fn delete(self) -> Result<(), TlsError> {
        let rc = unsafe { libc::pthread_key_delete(self.0) };
        if rc != 0 {
            return Err(TlsError::DeleteFailed(rc));
        }
        Ok(())
    }
}
