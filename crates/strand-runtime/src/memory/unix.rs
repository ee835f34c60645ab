//! Unix block allocation using posix_memalign

use std::ptr::{self, NonNull};

pub(super) fn aligned_alloc(size: usize, align: usize) -> Option<NonNull<u8>> {
    // posix_memalign wants a multiple of sizeof(void*)
    let align = align.max(std::mem::size_of::<*mut libc::c_void>());
    let mut out: *mut libc::c_void = ptr::null_mut();
    let rc = unsafe { libc::posix_memalign(&mut out, align, size) };
    if rc != 0 {
        return None;
    }
    NonNull::new(out as *mut u8)
}

pub(super) unsafe fn aligned_free(block: NonNull<u8>) {
    libc::free(block.as_ptr() as *mut libc::c_void);
}
