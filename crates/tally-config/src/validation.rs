//! Configuration validation module.
//!
//! Validates configuration values before any connection attempt is made,
//! failing fast on invalid configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Cache host is missing.
    MissingCacheHost,
    /// Cache port is invalid (must be 1-65535).
    InvalidCachePort { value: u16 },
    /// Unsupported cache protocol.
    UnsupportedProtocol { value: String },
    /// Default TTL must be a positive duration.
    NonPositiveDefaultTtl,
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCacheHost => {
                write!(f, "Cache host is required")
            }
            Self::InvalidCachePort { value } => {
                write!(f, "Invalid cache port: {} (must be 1-65535)", value)
            }
            Self::UnsupportedProtocol { value } => {
                write!(f, "Unsupported cache protocol: '{}' (only tcp)", value)
            }
            Self::NonPositiveDefaultTtl => {
                write!(f, "Cache default_ttl_secs must be positive")
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_cache(&config.cache, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    /// Validates cache configuration.
    fn validate_cache(config: &crate::CacheConfig, result: &mut ValidationResult) {
        if config.host.trim().is_empty() {
            result.add_error(ConfigValidationError::MissingCacheHost);
        }

        // Port 0 cannot be dialed
        if config.port == 0 {
            result.add_error(ConfigValidationError::InvalidCachePort {
                value: config.port,
            });
        }

        if config.protocol != "tcp" {
            result.add_error(ConfigValidationError::UnsupportedProtocol {
                value: config.protocol.clone(),
            });
        }

        if config.default_ttl_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveDefaultTtl);
        }
    }

    /// Validates observability configuration.
    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
