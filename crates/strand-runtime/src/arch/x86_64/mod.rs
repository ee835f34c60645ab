//! x86_64 context switching
//!
//! Two calling conventions share this file. System V (Linux, BSD, macOS)
//! saves the six callee-saved GPRs plus MXCSR and the x87 control word.
//! Windows x64 additionally saves `rdi`, `rsi`, `xmm6`-`xmm15` and the
//! stack bounds the OS keeps in the thread information block.
//!
//! Save area (System V):
//!
//! ```text
//! 0x00 rsp   0x08 rip   0x10 rbx   0x18 rbp
//! 0x20 r12   0x28 r13   0x30 r14   0x38 r15
//! 0x40 mxcsr (u32)      0x44 x87 control word (u16)
//! ```
//!
//! Windows appends `0x48 rdi`, `0x50 rsi`, `0x58..0x70` TIB stack base,
//! stack limit and deallocation stack, and `0x80..0x120` xmm6-xmm15.

use std::arch::{asm, naked_asm};
use strand_core::layout::{RegisterLayout, SaveArea};
use strand_core::ContextBackend;

const MXCSR: usize = 0x40;
const FPU_CW: usize = 0x44;

#[cfg(not(windows))]
const LAYOUT: RegisterLayout = RegisterLayout {
    name: "x86_64-sysv",
    save_area_size: 0x50,
    block_align: 64,
    stack_align: 16,
    red_zone: 64,
    entry_bias: 8,
    sp: 0x00,
    ret: 0x08,
    gp: None,
};

#[cfg(windows)]
const LAYOUT: RegisterLayout = RegisterLayout {
    name: "x86_64-win64",
    save_area_size: 0x120,
    block_align: 64,
    stack_align: 16,
    // Covers the 32-byte home space the callee may spill into
    red_zone: 64,
    entry_bias: 8,
    sp: 0x00,
    ret: 0x08,
    gp: None,
};

#[cfg(windows)]
const TIB_STACK_BASE: usize = 0x58;
#[cfg(windows)]
const TIB_STACK_LIMIT: usize = 0x60;
#[cfg(windows)]
const TIB_DEALLOC_STACK: usize = 0x68;

const _: () = assert!(LAYOUT.is_consistent());

/// x86_64 backend
pub struct X86_64;

unsafe impl ContextBackend for X86_64 {
    const LAYOUT: &'static RegisterLayout = &LAYOUT;

    #[inline(always)]
    unsafe fn swap(save: *mut u8, load: *const u8) {
        strand_swap(save, load)
    }

    fn seed(area: &mut SaveArea<'_>, stack_lo: usize, stack_hi: usize) {
        let mut mxcsr: u32 = 0;
        let mut fpu_cw: u16 = 0;
        // Safety: both operands point at live locals of the right width
        unsafe {
            asm!(
                "stmxcsr dword ptr [{m}]",
                "fnstcw word ptr [{f}]",
                m = in(reg) &mut mxcsr as *mut u32,
                f = in(reg) &mut fpu_cw as *mut u16,
                options(nostack, preserves_flags),
            );
        }
        area.write_u32(MXCSR, mxcsr);
        area.write_u16(FPU_CW, fpu_cw);

        #[cfg(windows)]
        {
            area.write_word(TIB_STACK_BASE, stack_hi);
            area.write_word(TIB_STACK_LIMIT, stack_lo);
            area.write_word(TIB_DEALLOC_STACK, stack_lo);
        }
        #[cfg(not(windows))]
        let _ = (stack_lo, stack_hi);
    }
}

/// Save into RDI, load from RSI (System V)
///
/// The caller's return address is popped and stored as the resume point, so
/// resuming lands right after the original `call` with the stack balanced.
#[cfg(not(windows))]
#[unsafe(naked)]
unsafe extern "C" fn strand_swap(_save: *mut u8, _load: *const u8) {
    naked_asm!(
        "pop rax",
        "mov [rdi + 0x00], rsp",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        "stmxcsr dword ptr [rdi + 0x40]",
        "fnstcw word ptr [rdi + 0x44]",
        "mov rsp, [rsi + 0x00]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "ldmxcsr dword ptr [rsi + 0x40]",
        "fldcw word ptr [rsi + 0x44]",
        "jmp qword ptr [rsi + 0x08]",
    );
}

/// Save into RCX, load from RDX (Windows x64)
#[cfg(windows)]
#[unsafe(naked)]
unsafe extern "C" fn strand_swap(_save: *mut u8, _load: *const u8) {
    naked_asm!(
        "pop rax",
        "mov [rcx + 0x00], rsp",
        "mov [rcx + 0x08], rax",
        "mov [rcx + 0x10], rbx",
        "mov [rcx + 0x18], rbp",
        "mov [rcx + 0x20], r12",
        "mov [rcx + 0x28], r13",
        "mov [rcx + 0x30], r14",
        "mov [rcx + 0x38], r15",
        "stmxcsr dword ptr [rcx + 0x40]",
        "fnstcw word ptr [rcx + 0x44]",
        "mov [rcx + 0x48], rdi",
        "mov [rcx + 0x50], rsi",
        "mov r10, qword ptr gs:[0x08]",
        "mov [rcx + 0x58], r10",
        "mov r10, qword ptr gs:[0x10]",
        "mov [rcx + 0x60], r10",
        "mov r10, qword ptr gs:[0x1478]",
        "mov [rcx + 0x68], r10",
        "movaps [rcx + 0x80], xmm6",
        "movaps [rcx + 0x90], xmm7",
        "movaps [rcx + 0xa0], xmm8",
        "movaps [rcx + 0xb0], xmm9",
        "movaps [rcx + 0xc0], xmm10",
        "movaps [rcx + 0xd0], xmm11",
        "movaps [rcx + 0xe0], xmm12",
        "movaps [rcx + 0xf0], xmm13",
        "movaps [rcx + 0x100], xmm14",
        "movaps [rcx + 0x110], xmm15",
        "mov rsp, [rdx + 0x00]",
        "mov rbx, [rdx + 0x10]",
        "mov rbp, [rdx + 0x18]",
        "mov r12, [rdx + 0x20]",
        "mov r13, [rdx + 0x28]",
        "mov r14, [rdx + 0x30]",
        "mov r15, [rdx + 0x38]",
        "ldmxcsr dword ptr [rdx + 0x40]",
        "fldcw word ptr [rdx + 0x44]",
        "mov rdi, [rdx + 0x48]",
        "mov rsi, [rdx + 0x50]",
        "mov r10, [rdx + 0x58]",
        "mov qword ptr gs:[0x08], r10",
        "mov r10, [rdx + 0x60]",
        "mov qword ptr gs:[0x10], r10",
        "mov r10, [rdx + 0x68]",
        "mov qword ptr gs:[0x1478], r10",
        "movaps xmm6, [rdx + 0x80]",
        "movaps xmm7, [rdx + 0x90]",
        "movaps xmm8, [rdx + 0xa0]",
        "movaps xmm9, [rdx + 0xb0]",
        "movaps xmm10, [rdx + 0xc0]",
        "movaps xmm11, [rdx + 0xd0]",
        "movaps xmm12, [rdx + 0xe0]",
        "movaps xmm13, [rdx + 0xf0]",
        "movaps xmm14, [rdx + 0x100]",
        "movaps xmm15, [rdx + 0x110]",
        "jmp qword ptr [rdx + 0x08]",
    );
}
