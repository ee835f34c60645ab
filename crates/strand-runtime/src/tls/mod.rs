//! Dynamically allocated thread-local slots
//!
//! A `TlsSlot` is one OS TLS key: every thread sees its own pointer-sized
//! value in it, null until that thread stores something. Values are raw
//! pointers and are never freed by the slot.

use std::ffi::c_void;
use std::fmt;
use std::mem;
use strand_core::{kdebug, kwarn, StrandResult};

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use self::unix as sys;
    } else if #[cfg(windows)] {
        mod windows;
        use self::windows as sys;
    }
}

/// One OS thread-local storage key
pub struct TlsSlot {
    key: sys::NativeKey,
}

impl TlsSlot {
    pub fn new() -> StrandResult<Self> {
        let key = sys::NativeKey::create()?;
        kdebug!("allocated tls key {:?}", key);
        Ok(Self { key })
    }

    /// This thread's value; null if never set here
    #[inline]
    pub fn get(&self) -> *mut c_void {
        self.key.get()
    }

    /// Store this thread's value
    #[inline]
    pub fn set(&self, value: *mut c_void) -> StrandResult<()> {
        self.key.set(value).map_err(Into::into)
    }

    /// Release the key, reporting failure
    ///
    /// Values still stored by other threads are not freed.
    pub fn delete(self) -> StrandResult<()> {
        let key = self.key;
        mem::forget(self);
        key.delete().map_err(Into::into)
    }
}

impl Drop for TlsSlot {
    fn drop(&mut self) {
        if let Err(e) = self.key.delete() {
            kwarn!("tls key release failed: {}", e);
        }
    }
}

impl fmt::Debug for TlsSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TlsSlot").field(&self.key).finish()
    }
}
