//! Runtime configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (runtime)
//! 2. User's config file named by `STRAND_CONFIG_RS` (compile-time)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use strand_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env().context_stack_size(64 * 1024);
//! config.validate()?;
//! strand_runtime::config::install(config)?;
//! ```

/// Defaults merged by build.rs
pub mod defaults {
    include!(concat!(env!("OUT_DIR"), "/strand_defaults.rs"));
}

use std::sync::OnceLock;

use strand_core::constants::{MIN_STACK_SIZE, MIN_THREAD_STACK_SIZE};
use strand_core::env::{env_get, env_get_bool};
use strand_core::kprint::{self, LogLevel};
use strand_core::{ConfigError, StrandResult};

/// Runtime configuration with builder pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size used by `Context::with_default_stack`
    pub context_stack_size: usize,
    /// Native thread stack size, 0 for the platform default
    pub thread_stack_size: usize,
    /// Raise the log level to debug when installed
    pub debug_logging: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RuntimeConfig {
    /// Compile-time defaults with environment overrides
    ///
    /// Environment variables (all optional):
    /// - `STRAND_CONTEXT_STACK_SIZE` - default coroutine stack in bytes
    /// - `STRAND_THREAD_STACK_SIZE` - native thread stack in bytes (0 = OS default)
    /// - `STRAND_DEBUG` - enable debug logging (0/1)
    pub fn from_env() -> Self {
        Self {
            context_stack_size: env_get("STRAND_CONTEXT_STACK_SIZE", defaults::CONTEXT_STACK_SIZE),
            thread_stack_size: env_get("STRAND_THREAD_STACK_SIZE", defaults::THREAD_STACK_SIZE),
            debug_logging: env_get_bool("STRAND_DEBUG", defaults::DEBUG_LOGGING),
        }
    }

    /// Compile-time defaults only, no environment lookup
    pub fn new() -> Self {
        Self {
            context_stack_size: defaults::CONTEXT_STACK_SIZE,
            thread_stack_size: defaults::THREAD_STACK_SIZE,
            debug_logging: defaults::DEBUG_LOGGING,
        }
    }

    pub fn context_stack_size(mut self, size: usize) -> Self {
        self.context_stack_size = size;
        self
    }

    pub fn thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = size;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context_stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("context_stack_size below minimum"));
        }
        if self.thread_stack_size != 0 && self.thread_stack_size < MIN_THREAD_STACK_SIZE {
            return Err(ConfigError::InvalidValue(
                "thread_stack_size must be 0 or at least 64KB",
            ));
        }
        Ok(())
    }
}

static GLOBAL: OnceLock<RuntimeConfig> = OnceLock::new();

/// Install the process-wide configuration
///
/// Must happen before the first `global()` call; later calls fail with the
/// already-active configuration left untouched.
pub fn install(config: RuntimeConfig) -> StrandResult<()> {
    config.validate()?;
    let debug = config.debug_logging;
    GLOBAL
        .set(config)
        .map_err(|_| ConfigError::InvalidValue("configuration already installed"))?;
    if debug {
        kprint::set_log_level(LogLevel::Debug);
    }
    Ok(())
}

/// Process-wide configuration, initialized from the environment on first use
pub fn global() -> &'static RuntimeConfig {
    GLOBAL.get_or_init(|| {
        let config = RuntimeConfig::from_env();
        if config.validate().is_err() {
            strand_core::kwarn!("invalid STRAND_* environment overrides, using defaults");
            return RuntimeConfig::new();
        }
        if config.debug_logging {
            kprint::set_log_level(LogLevel::Debug);
        }
        config
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = RuntimeConfig::new();
        assert_eq!(config.context_stack_size, defaults::CONTEXT_STACK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .context_stack_size(1 << 20)
            .thread_stack_size(128 * 1024)
            .debug_logging(true);

        assert_eq!(config.context_stack_size, 1 << 20);
        assert_eq!(config.thread_stack_size, 128 * 1024);
        assert!(config.debug_logging);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(RuntimeConfig::new().context_stack_size(512).validate().is_err());
        assert!(RuntimeConfig::new().thread_stack_size(4096).validate().is_err());
        assert!(RuntimeConfig::new().thread_stack_size(0).validate().is_ok());
    }

    #[test]
    fn test_global_is_stable() {
        let a = global() as *const RuntimeConfig;
        let b = global() as *const RuntimeConfig;
        assert_eq!(a, b);
        assert!(global().validate().is_ok());
    }
}
