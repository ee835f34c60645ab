//! Windows block allocation using the CRT's _aligned_malloc

use std::ptr::NonNull;

pub(super) fn aligned_alloc(size: usize, align: usize) -> Option<NonNull<u8>> {
    let out = unsafe { libc::aligned_malloc(size, align) };
    NonNull::new(out as *mut u8)
}

pub(super) unsafe fn aligned_free(block: NonNull<u8>) {
    libc::aligned_free(block.as_ptr() as *mut libc::c_void);
}
