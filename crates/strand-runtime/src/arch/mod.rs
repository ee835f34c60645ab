//! Architecture-specific context switching
//!
//! One backend per instruction set, selected at build time. Each backend
//! owns its save-area table and its `swap` routine; `init_block` prepares a
//! fresh context block the same way for all of them.

use strand_core::layout::SaveArea;
use strand_core::ContextBackend;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        pub use self::x86_64::X86_64 as CurrentBackend;
    } else if #[cfg(target_arch = "aarch64")] {
        mod aarch64;
        pub use self::aarch64::Aarch64 as CurrentBackend;
    } else if #[cfg(target_arch = "riscv64")] {
        mod riscv64;
        pub use self::riscv64::Riscv64 as CurrentBackend;
    } else {
        compile_error!("strand supports x86_64, aarch64 and riscv64 only");
    }
}

/// Prepare a freshly allocated block so that switching to it runs `entry`
///
/// Clears the save area, lets the backend seed inherited registers, then
/// sets the initial stack pointer and the resume address. ABIs that enter
/// with a return address on the stack get a zero one, so a backtrace stops
/// there.
///
/// # Safety
///
/// `base` must point to `block_len` writable bytes aligned to
/// `B::LAYOUT.block_align`, with `block_len` obtained from
/// `B::LAYOUT.block_size`.
pub unsafe fn init_block<B: ContextBackend>(base: *mut u8, block_len: usize, entry: usize) {
    let layout = B::LAYOUT;
    let base_addr = base as usize;
    let (stack_lo, stack_hi) = layout.stack_region(base_addr, block_len);
    let sp = layout.initial_stack_pointer(base_addr, block_len);

    let mut area = SaveArea::from_raw(base, layout);
    area.zero();
    B::seed(&mut area, stack_lo, stack_hi);
    area.set_stack_pointer(sp);
    area.set_return_address(entry);

    if layout.entry_bias != 0 {
        (sp as *mut usize).write(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{alloc_block, free_block};
    use std::cell::RefCell;
    use std::ptr::NonNull;

    const RING: usize = 3;
    const LAPS: usize = 20;

    // Drives the backend directly, without the engine's bookkeeping
    struct Hops {
        home: NonNull<u8>,
        blocks: Vec<NonNull<u8>>,
        current: usize,
        laps: usize,
        visits: usize,
    }

    thread_local! {
        static HOPS: RefCell<Option<Hops>> = const { RefCell::new(None) };
    }

    extern "C" fn hop() -> ! {
        loop {
            let (save, load) = HOPS.with(|h| {
                let mut h = h.borrow_mut();
                let h = h.as_mut().unwrap();
                h.visits += 1;
                let me = h.current;
                let save = h.blocks[me].as_ptr();
                if me + 1 < RING {
                    h.current = me + 1;
                    return (save, h.blocks[me + 1].as_ptr() as *const u8);
                }
                h.laps += 1;
                if h.laps == LAPS {
                    return (save, h.home.as_ptr() as *const u8);
                }
                h.current = 0;
                (save, h.blocks[0].as_ptr() as *const u8)
            });
            unsafe { CurrentBackend::swap(save, load) };
        }
    }

    #[test]
    fn test_backend_ring_handoff() {
        let layout = <CurrentBackend as ContextBackend>::LAYOUT;
        assert!(layout.is_consistent());
        let len = layout.block_size(32 * 1024).unwrap();

        let blocks: Vec<_> = (0..RING)
            .map(|_| {
                let block = alloc_block(len, layout.block_align).unwrap();
                unsafe { init_block::<CurrentBackend>(block.as_ptr(), len, hop as usize) };
                block
            })
            .collect();
        // Receives the test thread's registers; only the save area is used
        let home = alloc_block(layout.save_area_size, layout.block_align).unwrap();

        HOPS.with(|h| {
            *h.borrow_mut() = Some(Hops {
                home,
                blocks: blocks.clone(),
                current: 0,
                laps: 0,
                visits: 0,
            })
        });

        unsafe { CurrentBackend::swap(home.as_ptr(), blocks[0].as_ptr()) };

        let visits = HOPS.with(|h| h.borrow_mut().take().unwrap().visits);
        assert_eq!(visits, RING * LAPS);

        unsafe {
            for block in blocks {
                free_block(block);
            }
            free_block(home);
        }
    }

    #[test]
    fn test_fresh_block_registers() {
        let layout = <CurrentBackend as ContextBackend>::LAYOUT;
        let len = layout.block_size(16 * 1024).unwrap();
        let block = alloc_block(len, layout.block_align).unwrap();
        unsafe { init_block::<CurrentBackend>(block.as_ptr(), len, hop as usize) };

        let base = block.as_ptr() as usize;
        let (lo, hi) = layout.stack_region(base, len);
        let (sp, ret) = {
            let area = unsafe { SaveArea::from_raw(block.as_ptr(), layout) };
            (area.stack_pointer(), area.return_address())
        };

        assert_eq!(ret, hop as usize);
        assert!(sp > lo && sp + layout.red_zone <= hi);
        assert_eq!((sp + layout.entry_bias) % layout.stack_align, 0);
        unsafe { free_block(block) };
    }
}
