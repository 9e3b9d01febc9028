//! Configuration validation.
//!
//! This module checks a loaded configuration for values that would make the
//! store unusable or playback misbehave.

use crate::error::{ConfigError, Result, TreeplayError};
use tracing::{debug, warn};

use super::spec::{LoggingConfig, RecordingDefaults, StoreBackend, StoreConfig, ToolConfig};

/// Validator for tool configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

const KNOWN_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a tool configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &ToolConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_store(&config.store, &mut result);
        Self::validate_recording(&config.recording, &mut result);
        Self::validate_logging(&config.logging, &mut result);

        for warning in &result.warnings {
            warn!("Configuration: {warning}");
        }

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(TreeplayError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    fn validate_store(store: &StoreConfig, result: &mut ValidationResult) {
        match store.backend {
            StoreBackend::File => {
                if store.path.as_ref().is_none_or(|p| p.as_os_str().is_empty()) {
                    result.errors.push(ValidationError {
                        field: String::from("store.path"),
                        message: String::from("A store path is required when using the file backend"),
                    });
                }
            }
            StoreBackend::Memory => {
                if store.path.is_some() {
                    result
                        .warnings
                        .push(String::from("store.path is ignored by the memory backend"));
                }
            }
        }
    }

    fn validate_recording(recording: &RecordingDefaults, result: &mut ValidationResult) {
        if recording.timeout_seconds == 0 {
            result.warnings.push(String::from(
                "recording.timeout_seconds is 0; the playback watchdog is disabled",
            ));
        }
    }

    fn validate_logging(logging: &LoggingConfig, result: &mut ValidationResult) {
        let level = logging.level.trim();
        if level.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("logging.level"),
                message: String::from("Log level cannot be empty"),
            });
        } else if !level.contains('=') && !KNOWN_LEVELS.contains(&level.to_lowercase().as_str()) {
            result.warnings.push(format!("unrecognized log level '{level}'"));
        }
    }
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new()
            .validate(&ToolConfig::default())
            .expect("defaults should validate");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_file_backend_requires_path() {
        let mut config = ToolConfig::default();
        config.store.path = None;
        let err = ConfigValidator::new().validate(&config).expect_err("should fail");
        assert!(matches!(
            err,
            TreeplayError::Config(ConfigError::ValidationError { field: Some(ref f), .. }) if f == "store.path"
        ));
    }

    #[test]
    fn test_memory_backend_needs_no_path() {
        let mut config = ToolConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.store.path = None;
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_zero_timeout_warns() {
        let mut config = ToolConfig::default();
        config.recording.timeout_seconds = 0;
        let result = ConfigValidator::new().validate(&config).expect("should validate");
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.error_count(), 0);
    }

    #[test]
    fn test_log_directives_accepted() {
        let mut config = ToolConfig::default();
        config.logging.level = String::from("treeplay=debug,info");
        let result = ConfigValidator::new().validate(&config).expect("should validate");
        assert_eq!(result.warning_count(), 0);

        config.logging.level = String::from("loud");
        let result = ConfigValidator::new().validate(&config).expect("should validate");
        assert_eq!(result.warning_count(), 1);
    }
}
