//! # strand-runtime
//!
//! Platform-specific runtime for strand.
//!
//! This crate provides:
//! - Context blocks (aligned heap allocation)
//! - Context switching (architecture-specific assembly)
//! - Native threads, mutexes and condition variables
//! - Auto-reset events (futex / kernel event / std fallback)
//! - Dynamically allocated thread-local slots

pub mod config;
pub mod memory;
pub mod arch;
pub mod context;
pub mod event;
pub mod mutex;
pub mod cond;
pub mod thread;
pub mod tls;

// Re-exports
pub use config::RuntimeConfig;
pub use arch::CurrentBackend;
pub use context::{active, switch_to, Context, EntryFn};
pub use event::{BinaryEvent, FallbackEvent, PlatformEvent};
pub use mutex::{Mutex, MutexGuard};
pub use cond::{CondBackend, Condvar, EmulatedCond, PlatformCond};
#[cfg(unix)]
pub use cond::NativeCond;
pub use thread::{is_self, Builder, Thread};
pub use tls::TlsSlot;
