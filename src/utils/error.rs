use crate::domain::model::Slot;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Slot conflict: {slot} is no longer available")]
    ConflictError { slot: Slot },

    #[error("{kind} not found: {id}")]
    NotFoundError { kind: &'static str, id: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Conflict,
    Lookup,
    Input,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReservationError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFoundError {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ConflictError { .. } => ErrorCategory::Conflict,
            Self::NotFoundError { .. } => ErrorCategory::Lookup,
            Self::ValidationError { .. } => ErrorCategory::Input,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Conflict => ErrorSeverity::Medium,
            ErrorCategory::Lookup | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// Conflicts are recoverable but never retried with the same slot.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IoError(_))
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => {
                "Fix the provider profile (weekly template, services, time zone) and reload the catalog"
            }
            Self::ConflictError { .. } => {
                "Fetch the day's slots again and pick another free slot"
            }
            Self::NotFoundError { .. } => "Check the provider, service, worker or booking id",
            Self::ValidationError { .. } => "Check the request parameters",
            Self::IoError(_) => "Check that the journal path is writable and retry",
            Self::SerializationError(_) => "The journal may be corrupted; inspect the last lines",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ConflictError { slot } => {
                format!("The slot starting at {} was just taken", slot.start)
            }
            Self::NotFoundError { kind, id } => format!("Unknown {}: {}", kind, id),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_not_retryable() {
        let err = ReservationError::ConflictError {
            slot: Slot::free(
                "2026-10-19T09:00:00Z".parse().unwrap(),
                "2026-10-19T09:45:00Z".parse().unwrap(),
                Some("w1".to_string()),
            ),
        };
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("09:00"));
    }

    #[test]
    fn test_not_found_message() {
        let err = ReservationError::not_found("provider", "sp9");
        assert_eq!(err.to_string(), "provider not found: sp9");
        assert_eq!(err.user_friendly_message(), "Unknown provider: sp9");
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
