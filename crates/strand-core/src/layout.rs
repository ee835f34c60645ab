//! Register save-area layout tables
//!
//! A context block is one aligned allocation:
//!
//! ```text
//! base                                   base + save_area_size        base + len
//! ├── save area (fixed, per arch) ───────┼── stack region (grows down) ──┤
//! │ sp │ ret │ gp? │ callee-saved ...    │                   ... │ red zone │
//! ```
//!
//! Each architecture describes its save area with a `RegisterLayout`: the
//! byte size, the offset of every slot the engine touches directly, and the
//! alignment rules for the block and the stack. The assembly switch routine
//! of that architecture uses the same offsets. All slot access goes through
//! `SaveArea`, which copies native-endian bytes in and out of the buffer.

/// Byte width of one general-purpose register slot
pub const WORD: usize = core::mem::size_of::<usize>();

/// Per-architecture description of the save area and stack rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    /// Short ABI name, e.g. "x86_64-sysv"
    pub name: &'static str,
    /// Save area size in bytes; the stack region starts right after it
    pub save_area_size: usize,
    /// Alignment of the whole block; block length is a multiple of it
    pub block_align: usize,
    /// ABI stack-pointer alignment
    pub stack_align: usize,
    /// Bytes left unused between the initial stack pointer and the block end
    pub red_zone: usize,
    /// Subtracted from the aligned initial stack pointer. x86_64 enters
    /// functions with a return address pushed, so its entry SP is 8 below
    /// a 16-byte boundary.
    pub entry_bias: usize,
    /// Offset of the stack-pointer slot
    pub sp: usize,
    /// Offset of the return-address (resume PC) slot
    pub ret: usize,
    /// Offset of the global-pointer slot, for ABIs that have one
    pub gp: Option<usize>,
}

/// Round `value` up to a multiple of `align` (a power of two)
#[inline]
pub const fn round_up(value: usize, align: usize) -> Option<usize> {
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

impl RegisterLayout {
    /// Total block length for a requested stack size
    ///
    /// `save_area_size + stack_size`, rounded up to `block_align`.
    /// `None` on arithmetic overflow.
    #[inline]
    pub const fn block_size(&self, stack_size: usize) -> Option<usize> {
        match self.save_area_size.checked_add(stack_size) {
            Some(total) => round_up(total, self.block_align),
            None => None,
        }
    }

    /// Stack region `[lo, hi)` of a block
    #[inline]
    pub const fn stack_region(&self, base: usize, block_len: usize) -> (usize, usize) {
        (base + self.save_area_size, base + block_len)
    }

    /// Stack pointer a fresh context starts with
    ///
    /// Highest `stack_align`-aligned address at least `red_zone` below the
    /// block end, minus `entry_bias`.
    #[inline]
    pub const fn initial_stack_pointer(&self, base: usize, block_len: usize) -> usize {
        let top = base + block_len - self.red_zone;
        (top & !(self.stack_align - 1)) - self.entry_bias
    }

    /// Static sanity check of the table; backends assert it at compile time
    pub const fn is_consistent(&self) -> bool {
        let pow2 = self.block_align.is_power_of_two() && self.stack_align.is_power_of_two();
        let slots_fit = self.sp + WORD <= self.save_area_size
            && self.ret + WORD <= self.save_area_size;
        let gp_fits = match self.gp {
            Some(off) => off + WORD <= self.save_area_size && off % WORD == 0,
            None => true,
        };
        pow2
            && slots_fit
            && gp_fits
            && self.sp % WORD == 0
            && self.ret % WORD == 0
            && self.save_area_size % self.stack_align == 0
            && self.block_align >= self.stack_align
            && self.entry_bias < self.stack_align
    }
}

/// Typed view over one context's save area
///
/// Reads and writes are bounds-checked against the save area and go through
/// byte copies, so offsets never need to be aligned for a particular type.
pub struct SaveArea<'a> {
    bytes: &'a mut [u8],
    layout: &'static RegisterLayout,
}

impl<'a> SaveArea<'a> {
    /// Wrap an existing buffer of exactly `layout.save_area_size` bytes
    pub fn new(bytes: &'a mut [u8], layout: &'static RegisterLayout) -> Self {
        assert_eq!(bytes.len(), layout.save_area_size, "save area size mismatch");
        Self { bytes, layout }
    }

    /// View the save area at the start of a context block
    ///
    /// # Safety
    ///
    /// `base` must point to at least `layout.save_area_size` writable bytes
    /// that nothing else accesses for the lifetime `'a`.
    pub unsafe fn from_raw(base: *mut u8, layout: &'static RegisterLayout) -> Self {
        let bytes = core::slice::from_raw_parts_mut(base, layout.save_area_size);
        Self { bytes, layout }
    }

    #[inline]
    pub fn layout(&self) -> &'static RegisterLayout {
        self.layout
    }

    /// Clear every slot
    pub fn zero(&mut self) {
        self.bytes.fill(0);
    }

    #[inline]
    pub fn read_word(&self, offset: usize) -> usize {
        let mut raw = [0u8; WORD];
        raw.copy_from_slice(&self.bytes[offset..offset + WORD]);
        usize::from_ne_bytes(raw)
    }

    #[inline]
    pub fn write_word(&mut self, offset: usize, value: usize) {
        self.bytes[offset..offset + WORD].copy_from_slice(&value.to_ne_bytes());
    }

    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_ne_bytes(raw)
    }

    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(&self.bytes[offset..offset + 2]);
        u16::from_ne_bytes(raw)
    }

    #[inline]
    pub fn write_u16(&mut self, offset: usize, value: u16) {
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_ne_bytes());
    }

    pub fn stack_pointer(&self) -> usize {
        self.read_word(self.layout.sp)
    }

    pub fn set_stack_pointer(&mut self, sp: usize) {
        self.write_word(self.layout.sp, sp);
    }

    pub fn return_address(&self) -> usize {
        self.read_word(self.layout.ret)
    }

    pub fn set_return_address(&mut self, pc: usize) {
        self.write_word(self.layout.ret, pc);
    }

    /// Store the global pointer; ignored on ABIs without one
    pub fn set_global_pointer(&mut self, gp: usize) {
        if let Some(off) = self.layout.gp {
            self.write_word(off, gp);
        }
    }

    pub fn global_pointer(&self) -> Option<usize> {
        self.layout.gp.map(|off| self.read_word(off))
    }
}
