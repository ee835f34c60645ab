//! Error types for strand primitives
//!
//! Every fallible constructor in the primitive layer reports failure through
//! `StrandResult`. Timeouts are not errors; they are a `bool` outcome of the
//! timed waits. Misuse (switching into a deleted context, double free) is not
//! detected.

use core::fmt;

/// Result type for primitive operations
pub type StrandResult<T> = Result<T, StrandError>;

/// Errors that can occur when creating or operating a primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrandError {
    /// Context block allocation failed
    Memory(MemoryError),

    /// Native thread operation failed
    Thread(ThreadError),

    /// Native lock / condition / event operation failed
    Sync(SyncError),

    /// Native thread-local storage operation failed
    Tls(TlsError),

    /// Invalid runtime configuration
    Config(ConfigError),
}

impl fmt::Display for StrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrandError::Memory(e) => write!(f, "memory error: {}", e),
            StrandError::Thread(e) => write!(f, "thread error: {}", e),
            StrandError::Sync(e) => write!(f, "sync error: {}", e),
            StrandError::Tls(e) => write!(f, "tls error: {}", e),
            StrandError::Config(e) => write!(f, "config error: {}", e),
        }
    }
}

impl std::error::Error for StrandError {}

/// Context block allocation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The aligned allocator returned no memory
    AllocationFailed { size: usize, align: usize },

    /// Requested stack size overflows the address space once rounded
    SizeOverflow(usize),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed { size, align } => {
                write!(f, "allocation of {} bytes (align {}) failed", size, align)
            }
            MemoryError::SizeOverflow(requested) => {
                write!(f, "stack size {} overflows when rounded", requested)
            }
        }
    }
}

impl From<MemoryError> for StrandError {
    fn from(e: MemoryError) -> Self {
        StrandError::Memory(e)
    }
}

/// Native thread errors; codes are the platform's error numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// Native thread creation failed
    SpawnFailed(i32),

    /// Native join failed
    JoinFailed(i32),

    /// Native detach failed
    DetachFailed(i32),

    /// Thread attribute (stack size) rejected
    AttrFailed(i32),
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadError::SpawnFailed(code) => write!(f, "failed to spawn thread (code {})", code),
            ThreadError::JoinFailed(code) => write!(f, "failed to join thread (code {})", code),
            ThreadError::DetachFailed(code) => write!(f, "failed to detach thread (code {})", code),
            ThreadError::AttrFailed(code) => {
                write!(f, "thread attribute rejected (code {})", code)
            }
        }
    }
}

impl From<ThreadError> for StrandError {
    fn from(e: ThreadError) -> Self {
        StrandError::Thread(e)
    }
}

/// Native synchronization object errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Mutex creation failed
    MutexInit(i32),

    /// Condition variable creation failed
    CondInit(i32),

    /// Binary event creation failed
    EventInit(i32),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::MutexInit(code) => write!(f, "mutex creation failed (code {})", code),
            SyncError::CondInit(code) => {
                write!(f, "condition variable creation failed (code {})", code)
            }
            SyncError::EventInit(code) => write!(f, "event creation failed (code {})", code),
        }
    }
}

impl From<SyncError> for StrandError {
    fn from(e: SyncError) -> Self {
        StrandError::Sync(e)
    }
}

/// Thread-local slot errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsError {
    /// No slot could be allocated
    CreateFailed(i32),

    /// Slot release failed
    DeleteFailed(i32),

    /// Value store failed
    SetFailed(i32),
}

impl fmt::Display for TlsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsError::CreateFailed(code) => write!(f, "tls slot creation failed (code {})", code),
            TlsError::DeleteFailed(code) => write!(f, "tls slot deletion failed (code {})", code),
            TlsError::SetFailed(code) => write!(f, "tls slot store failed (code {})", code),
        }
    }
}

impl From<TlsError> for StrandError {
    fn from(e: TlsError) -> Self {
        StrandError::Tls(e)
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl From<ConfigError> for StrandError {
    fn from(e: ConfigError) -> Self {
        StrandError::Config(e)
    }
}
