//! pthread-backed threads

use nix::errno::Errno;
use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::ptr;
use strand_core::ThreadError;

extern "C" fn trampoline(data: *mut c_void) -> *mut c_void {
    super::run_start(data);
    ptr::null_mut()
}

pub(super) struct NativeThread {
    id: libc::pthread_t,
}

impl NativeThread {
    /// # Safety
    ///
    /// `data` must be a leaked `ThreadStart` that nothing else will free
    /// if this returns `Ok`.
    pub(super) unsafe fn spawn(data: *mut c_void, stack_size: usize) -> Result<Self, ThreadError> {
        let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();
        let rc = libc::pthread_attr_init(attr.as_mut_ptr());
        if rc != 0 {
            return Err(ThreadError::AttrFailed(rc));
        }
        if stack_size != 0 {
            let rc = libc::pthread_attr_setstacksize(attr.as_mut_ptr(), stack_size);
            if rc != 0 {
                libc::pthread_attr_destroy(attr.as_mut_ptr());
                return Err(ThreadError::AttrFailed(rc));
            }
        }

        let mut id = MaybeUninit::<libc::pthread_t>::uninit();
        let rc = libc::pthread_create(id.as_mut_ptr(), attr.as_ptr(), trampoline, data);
        libc::pthread_attr_destroy(attr.as_mut_ptr());
        if rc != 0 {
            strand_core::kdebug!("pthread_create: {}", Errno::from_raw(rc));
            return Err(ThreadError::SpawnFailed(rc));
        }
        Ok(Self {
            id: id.assume_init(),
        })
    }

    pub(super) fn join(self) -> Result<(), ThreadError> {
        let rc = unsafe { libc::pthread_join(self.id, ptr::null_mut()) };
        if rc != 0 {
            return Err(ThreadError::JoinFailed(rc));
        }
        Ok(())
    }

    pub(super) fn detach(self) -> Result<(), ThreadError> {
        let rc = unsafe { libc::pthread_detach(self.id) };
        if rc != 0 {
            return Err(ThreadError::DetachFailed(rc));
        }
        Ok(())
    }

    pub(super) fn is_current(&self) -> bool {
        let me = nix::sys::pthread::pthread_self();
        unsafe { libc::pthread_equal(me, self.id) != 0 }
    }
}
