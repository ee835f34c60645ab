//! Context block memory
//!
//! One aligned heap block per context: the save area followed by the stack.
//! Platform-specific implementations wrap the C runtime's aligned allocator.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use unix as sys;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as sys;
    }
}

use std::ptr::NonNull;
use strand_core::MemoryError;

/// Allocate `size` bytes aligned to `align` (a power of two)
///
/// The contents are uninitialized.
pub fn alloc_block(size: usize, align: usize) -> Result<NonNull<u8>, MemoryError> {
    debug_assert!(align.is_power_of_two());
    sys::aligned_alloc(size, align).ok_or(MemoryError::AllocationFailed { size, align })
}

/// Release a block from `alloc_block`
///
/// # Safety
///
/// `ptr` must come from `alloc_block` and must not be used afterwards.
pub unsafe fn free_block(ptr: NonNull<u8>) {
    sys::aligned_free(ptr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_aligned_and_writable() {
        for align in [16usize, 64, 1024] {
            let block = alloc_block(8192, align).unwrap();
            assert_eq!(block.as_ptr() as usize % align, 0);
            unsafe {
                std::ptr::write_bytes(block.as_ptr(), 0x5a, 8192);
                assert_eq!(*block.as_ptr().add(8191), 0x5a);
                free_block(block);
            }
        }
    }

    #[test]
    fn test_alloc_failure_is_reported() {
        let size = usize::MAX / 2;
        let err = alloc_block(size, 64).unwrap_err();
        assert_eq!(err, MemoryError::AllocationFailed { size, align: 64 });
    }
}
