//! Architecture backend trait
//!
//! The interface between the platform-agnostic context engine and the
//! hand-written register switch of one instruction set. Exactly one backend
//! is selected at build time (`strand_runtime::arch::CurrentBackend`).

use crate::layout::{RegisterLayout, SaveArea};

/// One instruction set's context switch
///
/// # Safety
///
/// Implementors guarantee that `swap` saves every callee-saved register
/// required by the target calling convention into the offsets described by
/// `LAYOUT`, restores the same set from the target area, and resumes at the
/// address in the target's `ret` slot with the target's `sp`. A context whose
/// registers were saved by `swap` must resume exactly after the `swap` call
/// that saved it.
pub unsafe trait ContextBackend {
    /// Save-area table used by both the assembly and the engine
    const LAYOUT: &'static RegisterLayout;

    /// Save the live registers into `save` and load them from `load`
    ///
    /// Control transfers to `load`'s resume address. This call "returns"
    /// only when a later `swap` names `save` as its `load` argument.
    ///
    /// # Safety
    ///
    /// Both pointers must address save areas laid out per `LAYOUT`, `load`
    /// must hold either a seeded fresh context or one saved by `swap`, and
    /// `load` must not be live on any CPU.
    unsafe fn swap(save: *mut u8, load: *const u8);

    /// Fill the registers a fresh context needs besides `sp` and `ret`
    ///
    /// Captures values that must be valid before the entry function runs
    /// (global pointer, floating-point control words, OS stack bounds) from
    /// the calling thread. `stack_lo..stack_hi` is the new context's stack.
    fn seed(area: &mut SaveArea<'_>, stack_lo: usize, stack_hi: usize);
}
