use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Schedule {schedule_id}: cannot read {field} '{value}': {reason}")]
    TimestampError {
        schedule_id: i64,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Schedule {}: cannot decode record: {reason}", record_label(.schedule_id))]
    RecordDecodeError {
        schedule_id: Option<i64>,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

fn record_label(schedule_id: &Option<i64>) -> String {
    schedule_id.map_or_else(|| "<unknown>".to_string(), |id| id.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl SlotError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SlotError::ApiError(_) => ErrorCategory::Network,
            SlotError::ConfigError { .. }
            | SlotError::MissingConfigError { .. }
            | SlotError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SlotError::TimestampError { .. }
            | SlotError::RecordDecodeError { .. }
            | SlotError::ProcessingError { .. }
            | SlotError::SerializationError(_)
            | SlotError::CsvError(_) => ErrorCategory::Data,
            SlotError::IoError(_) | SlotError::ZipError(_) => ErrorCategory::System,
        }
    }

    /// Binaries turn this into the process exit code.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SlotError::ApiError(_) => {
                "Check that the schedule API is reachable, or raise retry_attempts"
            }
            SlotError::ConfigError { .. }
            | SlotError::MissingConfigError { .. }
            | SlotError::InvalidConfigValueError { .. } => {
                "Review the configuration file or command line flags"
            }
            SlotError::TimestampError { .. } | SlotError::RecordDecodeError { .. } => {
                "Fix the schedule record upstream, or set on_record_error = \"skip\""
            }
            SlotError::SerializationError(_) | SlotError::ProcessingError { .. } => {
                "Make sure the payload is a JSON array of schedule records"
            }
            SlotError::CsvError(_) | SlotError::IoError(_) | SlotError::ZipError(_) => {
                "Check that the output directory exists and is writable"
            }
        }
    }

    /// The schedule an error belongs to, when it can be told.
    pub fn schedule_id(&self) -> Option<i64> {
        match self {
            SlotError::TimestampError { schedule_id, .. } => Some(*schedule_id),
            SlotError::RecordDecodeError { schedule_id, .. } => *schedule_id,
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SlotError::ApiError(e) => format!("Could not fetch schedules: {}", e),
            SlotError::TimestampError {
                schedule_id, field, ..
            } => format!("Schedule {} has an unreadable {} field", schedule_id, field),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_error_names_record_and_field() {
        let err = SlotError::TimestampError {
            schedule_id: 4711,
            field: "startBreak2".to_string(),
            value: "25:00:00".to_string(),
            reason: "input is out of range".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Schedule 4711: cannot read startBreak2 '25:00:00': input is out of range"
        );
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("4711"));
        assert_eq!(err.schedule_id(), Some(4711));
    }

    #[test]
    fn test_decode_error_without_schedule_id() {
        let err = SlotError::RecordDecodeError {
            schedule_id: None,
            reason: "missing field `scheduleId`".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Schedule <unknown>: cannot decode record: missing field `scheduleId`"
        );
        assert_eq!(err.schedule_id(), None);
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = SlotError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().exit_code(), 3);
    }
}
