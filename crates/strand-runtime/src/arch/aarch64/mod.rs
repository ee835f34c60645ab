//! AArch64 context switching
//!
//! AAPCS64 callee-saved set: `x19`-`x28`, the frame pointer `x29`, the link
//! register `x30`, `sp` and the low halves of `v8`-`v15` (`d8`-`d15`).
//!
//! ```text
//! 0x00 sp    0x08 lr (resume pc)   0x10 fp
//! 0x18 x19 .. 0x60 x28
//! 0x68 d8  .. 0xa0 d15
//! ```

use std::arch::naked_asm;
use strand_core::layout::{RegisterLayout, SaveArea};
use strand_core::ContextBackend;

const LAYOUT: RegisterLayout = RegisterLayout {
    name: "aarch64-aapcs64",
    save_area_size: 0xb0,
    block_align: 64,
    stack_align: 16,
    red_zone: 64,
    entry_bias: 0,
    sp: 0x00,
    ret: 0x08,
    gp: None,
};

const _: () = assert!(LAYOUT.is_consistent());

/// AArch64 backend
pub struct Aarch64;

unsafe impl ContextBackend for Aarch64 {
    const LAYOUT: &'static RegisterLayout = &LAYOUT;

    #[inline(always)]
    unsafe fn swap(save: *mut u8, load: *const u8) {
        strand_swap(save, load)
    }

    // Nothing beyond sp and lr: a zeroed fp terminates frame-pointer walks
    fn seed(_area: &mut SaveArea<'_>, _stack_lo: usize, _stack_hi: usize) {}
}

/// Save into X0, load from X1, return through the loaded LR
#[unsafe(naked)]
unsafe extern "C" fn strand_swap(_save: *mut u8, _load: *const u8) {
    naked_asm!(
        "mov x9, sp",
        "str x9, [x0, #0x00]",
        "str x30, [x0, #0x08]",
        "str x29, [x0, #0x10]",
        "stp x19, x20, [x0, #0x18]",
        "stp x21, x22, [x0, #0x28]",
        "stp x23, x24, [x0, #0x38]",
        "stp x25, x26, [x0, #0x48]",
        "stp x27, x28, [x0, #0x58]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        "ldr x9, [x1, #0x00]",
        "mov sp, x9",
        "ldr x30, [x1, #0x08]",
        "ldr x29, [x1, #0x10]",
        "ldp x19, x20, [x1, #0x18]",
        "ldp x21, x22, [x1, #0x28]",
        "ldp x23, x24, [x1, #0x38]",
        "ldp x25, x26, [x1, #0x48]",
        "ldp x27, x28, [x1, #0x58]",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        "ret",
    );
}
