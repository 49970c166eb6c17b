// ABOUTME: Environment variable parsing utilities
// ABOUTME: Typed lookups with defaults, validation and warnings for bad values

use std::str::FromStr;

/// Parse an environment variable with validation
/// Returns the parsed value if it passes validation, otherwise returns the default
/// Logs warnings when environment variables are set but fail validation or parsing
pub fn parse_env_or_default_with_validation<T, F>(var_name: &str, default: T, validator: F) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(T) -> bool,
{
    match std::env::var(var_name) {
        Ok(raw_value) => match raw_value.trim().parse::<T>() {
            Ok(parsed_value) => {
                if validator(parsed_value) {
                    parsed_value
                } else {
                    tracing::warn!(
                        "Environment variable {} has invalid value '{}', using default: {}",
                        var_name,
                        raw_value,
                        default
                    );
                    default
                }
            }
            Err(_) => {
                tracing::warn!(
                    "Environment variable {} has unparseable value '{}', using default: {}",
                    var_name,
                    raw_value,
                    default
                );
                default
            }
        },
        // Variable not set, nothing to warn about
        Err(_) => default,
    }
}

/// Read a string variable, treating blank values as unset
pub fn string_env_or_default(var_name: &str, default: &str) -> String {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
