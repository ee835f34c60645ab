//! # strand-core
//!
//! Core types for the strand concurrency substrate.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Register switch routines, native threads and locks live in
//! `strand-runtime`.
//!
//! ## Modules
//!
//! - `layout` - Save-area offset tables and the `SaveArea` byte view
//! - `traits` - `ContextBackend`, implemented once per instruction set
//! - `error` - Error types
//! - `spinlock` - Internal spinlock primitive
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod layout;
pub mod traits;
pub mod error;
pub mod spinlock;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use layout::{RegisterLayout, SaveArea};
pub use traits::ContextBackend;
pub use error::{
    ConfigError, MemoryError, StrandError, StrandResult, SyncError, ThreadError, TlsError,
};
pub use spinlock::SpinLock;
pub use env::{env_get, env_get_bool, env_get_opt};

/// Sizing constants shared by runtime and config
pub mod constants {
    /// Smallest stack a context is created with; smaller requests are raised
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Smallest stack accepted for native threads (0 means platform default)
    pub const MIN_THREAD_STACK_SIZE: usize = 64 * 1024;
}
