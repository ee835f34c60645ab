//! Portable event on std `Mutex` + `Condvar`
//!
//! Used where no cheaper primitive exists, and as a second implementation
//! the emulated condition variable is tested against.

use super::{BinaryEvent, Deadline};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;
use strand_core::StrandResult;

/// Mutex/condvar auto-reset event
pub struct FallbackEvent {
    armed: Mutex<bool>,
    cond: Condvar,
}

impl BinaryEvent for FallbackEvent {
    fn new() -> StrandResult<Self> {
        Ok(Self {
            armed: Mutex::new(false),
            cond: Condvar::new(),
        })
    }

    fn set(&self) {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if !*armed {
            *armed = true;
            self.cond.notify_one();
        }
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = Deadline::after(timeout);
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *armed {
                *armed = false;
                return true;
            }
            armed = match deadline.remaining() {
                None => self
                    .cond
                    .wait(armed)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(d) if d.is_zero() => return false,
                Some(d) => {
                    self.cond
                        .wait_timeout(armed, d)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::tests::{check_cross_thread_wake, check_latch, check_timeout};

    #[test]
    fn test_fallback_event() {
        check_latch::<FallbackEvent>();
        check_timeout::<FallbackEvent>();
        check_cross_thread_wake::<FallbackEvent>();
    }
}
