//! Crate-wide constants for prettysql.
//!
//! Defaults used when no [`ClientConfig`](crate::ClientConfig) overrides them.

// =============================================================================
// Session Constants
// =============================================================================

/// Default number of live query handles a session keeps before evicting the
/// oldest one.
pub const DEFAULT_MAX_LIVE_QUERIES: usize = 16;

/// Smallest accepted query registry capacity.
pub const MIN_MAX_LIVE_QUERIES: usize = 1;

/// Largest accepted query registry capacity.
pub const MAX_MAX_LIVE_QUERIES: usize = 65_536;

// =============================================================================
// Result Constants
// =============================================================================

/// Initial per-column row capacity of a cached result.
///
/// Only an amortization hint; results grow past it freely.
pub const DEFAULT_ROW_CAPACITY_HINT: usize = 64;

/// Largest per-column row capacity reserved up front.
pub const MAX_ROW_CAPACITY_HINT: usize = 65_536;

// =============================================================================
// Named Parameter Constants
// =============================================================================

/// Marker introducing a named parameter.
pub const PARAMETER_PREFIX: char = ':';

/// Driver-native positional placeholder.
pub const NATIVE_PARAMETER: char = '?';

/// Characters terminating a bare `:name` parameter, in addition to whitespace.
pub const PARAMETER_SEPARATORS: &[char] = &[
    '"', '\'', ':', '&', ',', ';', '(', ')', '|', '=', '+', '-', '*', '%', '/', '\\', '<', '>',
    '^',
];

/// Expected number of named parameters in a typical statement.
pub const DEFAULT_PARAMETER_CAPACITY: usize = 8;

// =============================================================================
// Temporal Constants
// =============================================================================

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
pub const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Microseconds per day.
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_exclude_identifier_chars() {
        for c in ['a', 'Z', '0', '_', '.', '{', '}'] {
            assert!(!PARAMETER_SEPARATORS.contains(&c), "{c} must not be a separator");
        }
    }

    #[test]
    fn test_registry_defaults() {
        assert!(DEFAULT_MAX_LIVE_QUERIES >= MIN_MAX_LIVE_QUERIES);
        assert!(DEFAULT_MAX_LIVE_QUERIES <= MAX_MAX_LIVE_QUERIES);
        assert!(DEFAULT_ROW_CAPACITY_HINT <= MAX_ROW_CAPACITY_HINT);
        assert_eq!(MICROS_PER_DAY, 86_400_000_000);
    }
}
