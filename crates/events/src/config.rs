//! Environment-variable helpers shared by the client configs.

use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Read a variable that must be present and non-blank.
pub fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Read a variable, falling back to `default` when unset or blank.
pub fn or_default(name: &'static str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

/// Read a variable, treating blank as unset.
pub fn optional(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or blank.
///
/// A value that is present but unparseable is an error rather than
/// silently replaced by the default.
pub fn parsed_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => parse_value(name, &raw),
    }
}

pub(crate) fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_reports_name_and_value() {
        let err = parse_value::<u64>("POLL_INTERVAL_SECS", "ten").unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "POLL_INTERVAL_SECS",
                value: "ten".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "Invalid value for POLL_INTERVAL_SECS: \"ten\""
        );
    }

    #[test]
    fn parse_value_accepts_valid_numbers() {
        assert_eq!(parse_value::<u32>("X", "42"), Ok(42));
    }
}
