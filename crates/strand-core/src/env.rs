//! Environment variable helpers
//!
//! Used by the runtime configuration (`STRAND_*` overrides) and by the
//! logger. Unparseable values fall back to the default instead of failing.

use std::str::FromStr;

/// Parse `key` as `T`, or return `default` when unset or unparseable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Parse `key` as `T` if set and valid
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read `key` as a boolean flag
///
/// "1", "true", "yes", "on" are true and "0", "false", "no", "off" are false
/// (case-insensitive). Anything else, including unset, yields `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_returns_default() {
        let val: usize = env_get("__STRAND_TEST_UNSET__", 42);
        assert_eq!(val, 42);
        assert!(env_get_opt::<u64>("__STRAND_TEST_UNSET__").is_none());
        assert!(env_get_bool("__STRAND_TEST_UNSET__", true));
    }

    #[test]
    fn test_parse_and_fallback() {
        std::env::set_var("__STRAND_TEST_NUM__", " 65536 ");
        assert_eq!(env_get::<usize>("__STRAND_TEST_NUM__", 0), 65536);

        std::env::set_var("__STRAND_TEST_NUM__", "sixty");
        assert_eq!(env_get::<usize>("__STRAND_TEST_NUM__", 7), 7);
        std::env::remove_var("__STRAND_TEST_NUM__");
    }

    #[test]
    fn test_bool_variants() {
        for (raw, expected) in [("1", true), ("ON", true), ("no", false), ("0", false)] {
            std::env::set_var("__STRAND_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__STRAND_TEST_BOOL__", !expected), expected, "{}", raw);
        }
        std::env::set_var("__STRAND_TEST_BOOL__", "garbage");
        assert!(env_get_bool("__STRAND_TEST_BOOL__", true));
        std::env::remove_var("__STRAND_TEST_BOOL__");
    }
}
