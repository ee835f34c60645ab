//! Windows kernel auto-reset event

use super::{BinaryEvent, Deadline};
use std::ptr;
use std::time::Duration;
use strand_core::{StrandResult, SyncError};
use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, WAIT_OBJECT_0};
use windows_sys::Win32::System::Threading::{
    CreateEventW, SetEvent, WaitForSingleObject, INFINITE,
};

/// Auto-reset event handle
pub struct WinEvent {
    handle: HANDLE,
}

// Safety: event handles may be used from any thread
unsafe impl Send for WinEvent {}
unsafe impl Sync for WinEvent {}

impl BinaryEvent for WinEvent {
    fn new() -> StrandResult<Self> {
        // bManualReset = FALSE, bInitialState = FALSE
        let handle = unsafe { CreateEventW(ptr::null(), 0, 0, ptr::null()) };
        if handle == 0 {
            let code = unsafe { GetLastError() } as i32;
            return Err(SyncError::EventInit(code).into());
        }
        Ok(Self { handle })
    }

    fn set(&self) {
        unsafe { SetEvent(self.handle) };
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = Deadline::after(timeout);
        loop {
            let ms = match deadline.remaining() {
                None => INFINITE,
                Some(d) => millis_ceil(d),
            };
            if unsafe { WaitForSingleObject(self.handle, ms) } == WAIT_OBJECT_0 {
                return true;
            }
            // Millisecond rounding can end a wait early; retry until due
            if ms == 0 || deadline.expired() {
                return false;
            }
        }
    }
}

impl Drop for WinEvent {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.handle) };
    }
}

/// Round up to whole milliseconds, never reaching INFINITE
fn millis_ceil(d: Duration) -> u32 {
    let ms = d.as_nanos().div_ceil(1_000_000);
    ms.min((INFINITE - 1) as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::tests::{check_cross_thread_wake, check_latch, check_timeout};

    #[test]
    fn test_win_event() {
        check_latch::<WinEvent>();
        check_timeout::<WinEvent>();
        check_cross_thread_wake::<WinEvent>();
    }

    #[test]
    fn test_millis_ceil() {
        assert_eq!(millis_ceil(Duration::ZERO), 0);
        assert_eq!(millis_ceil(Duration::from_micros(1)), 1);
        assert_eq!(millis_ceil(Duration::from_millis(7)), 7);
        assert_eq!(millis_ceil(Duration::MAX), INFINITE - 1);
    }
}
