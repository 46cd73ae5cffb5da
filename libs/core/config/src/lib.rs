pub mod server;
pub mod tracing;

use std::any::type_name;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while assembling configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable '{key}'")]
    Missing { key: String },

    #[error("environment variable '{key}' has invalid value '{value}' (expected {expected})")]
    Invalid {
        key: String,
        value: String,
        expected: String,
    },
}

/// Deployment tier of the control plane.
///
/// Read from `HEXABASE_ENV` (`APP_ENV` as a fallback). Anything unrecognized
/// falls back to development, so a locally started binary never comes up with
/// production logging and TLS expectations by accident.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let raw = lookup("HEXABASE_ENV")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_default();

        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" | "stage" => Environment::Staging,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Whether logs should be JSON lines for the cluster log pipeline.
    /// Only local development keeps the human-readable format.
    pub fn structured_logs(&self) -> bool {
        !self.is_development()
    }
}

/// Config sections assemble themselves from the process environment.
/// Composite configs call `from_env` on each section and fail fast on the
/// first missing or malformed variable.
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Read a variable, treating empty and whitespace-only values as unset.
/// A stray `KEY=` in a deployment manifest must not shadow a default.
fn lookup(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Variable value, or the given default when unset/blank.
pub fn env_or_default(key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Variable value, or [`ConfigError::Missing`] when unset/blank.
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

/// Parse a typed variable, falling back to `default` when unset.
pub fn env_parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
            expected: type_name::<T>().to_string(),
        }),
        None => Ok(default),
    }
}

/// Static application metadata baked in at compile time
#[derive(Clone, Debug)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
}

/// Capture the calling crate's name and version as an [`AppInfo`]
#[macro_export]
macro_rules! app_info {
    () => {
        $crate::AppInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_vars_unset(["HEXABASE_ENV", "APP_ENV"], || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(!env.structured_logs());
        });
    }

    #[test]
    fn test_environment_tiers_and_aliases() {
        temp_env::with_var("HEXABASE_ENV", Some("prod"), || {
            assert!(Environment::from_env().is_production());
        });
        temp_env::with_var("HEXABASE_ENV", Some("Staging"), || {
            assert_eq!(Environment::from_env(), Environment::Staging);
            assert!(Environment::from_env().structured_logs());
        });
    }

    #[test]
    fn test_app_env_fallback() {
        temp_env::with_vars(
            [("HEXABASE_ENV", None), ("APP_ENV", Some("production"))],
            || {
                assert!(Environment::from_env().is_production());
            },
        );
    }

    #[test]
    fn test_blank_value_counts_as_unset() {
        temp_env::with_var("BLANK_XYZ", Some("   "), || {
            assert_eq!(env_or_default("BLANK_XYZ", "fallback"), "fallback");
            assert!(matches!(
                env_required("BLANK_XYZ"),
                Err(ConfigError::Missing { .. })
            ));
        });
    }

    #[test]
    fn test_env_required_present() {
        temp_env::with_var("REQUIRED_XYZ", Some(" value "), || {
            // Values are trimmed on the way in
            assert_eq!(env_required("REQUIRED_XYZ").unwrap(), "value");
        });
    }

    #[test]
    fn test_env_parse_or() {
        temp_env::with_var("PARSE_XYZ", Some("42"), || {
            let port: u16 = env_parse_or("PARSE_XYZ", 7).unwrap();
            assert_eq!(port, 42);
        });
        temp_env::with_var("PARSE_XYZ", Some("not-a-number"), || {
            assert!(matches!(
                env_parse_or::<u16>("PARSE_XYZ", 7),
                Err(ConfigError::Invalid { .. })
            ));
        });
        temp_env::with_var_unset("PARSE_XYZ", || {
            let port: u16 = env_parse_or("PARSE_XYZ", 7).unwrap();
            assert_eq!(port, 7);
        });
    }
}
