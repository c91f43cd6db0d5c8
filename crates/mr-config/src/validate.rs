//! Settings validation errors and semantic validation.

use thiserror::Error;

use crate::settings::EngineSettings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for the classifier deadline.
pub const MAX_CLASSIFIER_TIMEOUT_MS: u64 = 60_000;

/// Settings validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 70,
            ValidationError::ParseError(_) => 71,
            ValidationError::InvalidValue { .. } => 72,
            ValidationError::VersionMismatch { .. } => 73,
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &EngineSettings) -> ValidationResult<()> {
    // Only the major version has to match
    let expected_major = crate::SETTINGS_SCHEMA_VERSION.split('.').next();
    let actual_major = settings.schema_version.split('.').next();
    if expected_major != actual_major {
        return Err(ValidationError::VersionMismatch {
            expected: crate::SETTINGS_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    let timeout = settings.classifier.timeout_ms;
    if timeout == 0 || timeout > MAX_CLASSIFIER_TIMEOUT_MS {
        return Err(invalid(
            "classifier.timeout_ms",
            format!("must be in 1..={}, got {}", MAX_CLASSIFIER_TIMEOUT_MS, timeout),
        ));
    }

    if settings.classifier.enabled {
        match settings.classifier.endpoint.as_deref() {
            None => {
                return Err(invalid(
                    "classifier.endpoint",
                    "required when the classifier is enabled",
                ))
            }
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                return Err(invalid(
                    "classifier.endpoint",
                    format!("must be an http(s) URL, got '{}'", url),
                ))
            }
            Some(_) => {}
        }
    }

    if settings.batch.progress_every == 0 {
        return Err(invalid("batch.progress_every", "must be greater than zero"));
    }

    if let Some(path) = &settings.catalog.path {
        if path.as_os_str().is_empty() {
            return Err(invalid("catalog.path", "must not be empty when set"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&EngineSettings::default()).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = EngineSettings::default();
        settings.classifier.timeout_ms = 0;
        let err = validate_settings(&settings).unwrap_err();
        assert_eq!(err.code(), 72);
        assert!(err.to_string().contains("classifier.timeout_ms"));
    }

    #[test]
    fn test_enabled_classifier_needs_http_endpoint() {
        let mut settings = EngineSettings::default();
        settings.classifier.enabled = true;
        assert!(validate_settings(&settings).is_err());

        settings.classifier.endpoint = Some("ftp://nope".to_string());
        assert!(validate_settings(&settings).is_err());

        settings.classifier.endpoint = Some("https://classifier.local/tags".to_string());
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_major_version_mismatch() {
        let settings = EngineSettings {
            schema_version: "2.0.0".to_string(),
            ..EngineSettings::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(ValidationError::VersionMismatch { .. })
        ));

        let minor = EngineSettings {
            schema_version: "1.4.0".to_string(),
            ..EngineSettings::default()
        };
        assert!(validate_settings(&minor).is_ok());
    }

    #[test]
    fn test_zero_progress_interval_rejected() {
        let mut settings = EngineSettings::default();
        settings.batch.progress_every = 0;
        assert!(validate_settings(&settings).is_err());
    }
}
