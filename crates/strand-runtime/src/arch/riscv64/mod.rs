//! RISC-V 64 context switching
//!
//! LP64D callee-saved set: `sp`, `ra`, `s0`-`s11` and `fs0`-`fs11`. `gp`
//! is saved too; linker relaxation may address data through it, so a fresh
//! context inherits the creating thread's value.
//!
//! ```text
//! 0x00 sp   0x08 ra   0x10 gp
//! 0x18 s0  .. 0x70 s11
//! 0x78 fs0 .. 0xd0 fs11
//! ```

use std::arch::{asm, naked_asm};
use strand_core::layout::{RegisterLayout, SaveArea};
use strand_core::ContextBackend;

const LAYOUT: RegisterLayout = RegisterLayout {
    name: "riscv64-lp64d",
    save_area_size: 0xe0,
    block_align: 64,
    stack_align: 16,
    red_zone: 64,
    entry_bias: 0,
    sp: 0x00,
    ret: 0x08,
    gp: Some(0x10),
};

const _: () = assert!(LAYOUT.is_consistent());

/// RISC-V 64 backend
pub struct Riscv64;

unsafe impl ContextBackend for Riscv64 {
    const LAYOUT: &'static RegisterLayout = &LAYOUT;

    #[inline(always)]
    unsafe fn swap(save: *mut u8, load: *const u8) {
        strand_swap(save, load)
    }

    fn seed(area: &mut SaveArea<'_>, _stack_lo: usize, _stack_hi: usize) {
        let gp: usize;
        // Safety: reads a register, touches no memory
        unsafe {
            asm!("mv {}, gp", out(reg) gp, options(nomem, nostack, preserves_flags));
        }
        area.set_global_pointer(gp);
    }
}

/// Save into A0, load from A1, return through the loaded RA
#[unsafe(naked)]
unsafe extern "C" fn strand_swap(_save: *mut u8, _load: *const u8) {
    naked_asm!(
        "sd sp, 0(a0)",
        "sd ra, 8(a0)",
        "sd gp, 16(a0)",
        "sd s0, 24(a0)",
        "sd s1, 32(a0)",
        "sd s2, 40(a0)",
        "sd s3, 48(a0)",
        "sd s4, 56(a0)",
        "sd s5, 64(a0)",
        "sd s6, 72(a0)",
        "sd s7, 80(a0)",
        "sd s8, 88(a0)",
        "sd s9, 96(a0)",
        "sd s10, 104(a0)",
        "sd s11, 112(a0)",
        "fsd fs0, 120(a0)",
        "fsd fs1, 128(a0)",
        "fsd fs2, 136(a0)",
        "fsd fs3, 144(a0)",
        "fsd fs4, 152(a0)",
        "fsd fs5, 160(a0)",
        "fsd fs6, 168(a0)",
        "fsd fs7, 176(a0)",
        "fsd fs8, 184(a0)",
        "fsd fs9, 192(a0)",
        "fsd fs10, 200(a0)",
        "fsd fs11, 208(a0)",
        "ld sp, 0(a1)",
        "ld ra, 8(a1)",
        "ld gp, 16(a1)",
        "ld s0, 24(a1)",
        "ld s1, 32(a1)",
        "ld s2, 40(a1)",
        "ld s3, 48(a1)",
        "ld s4, 56(a1)",
        "ld s5, 64(a1)",
        "ld s6, 72(a1)",
        "ld s7, 80(a1)",
        "ld s8, 88(a1)",
        "ld s9, 96(a1)",
        "ld s10, 104(a1)",
        "ld s11, 112(a1)",
        "fld fs0, 120(a1)",
        "fld fs1, 128(a1)",
        "fld fs2, 136(a1)",
        "fld fs3, 144(a1)",
        "fld fs4, 152(a1)",
        "fld fs5, 160(a1)",
        "fld fs6, 168(a1)",
        "fld fs7, 176(a1)",
        "fld fs8, 184(a1)",
        "fld fs9, 192(a1)",
        "fld fs10, 200(a1)",
        "fld fs11, 208(a1)",
        "ret",
    );
}
