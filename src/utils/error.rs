use thiserror::Error;

#[derive(Error, Debug)]
pub enum BaziError {
    #[error("Calendar service request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Calendar service error: {message}")]
    CalendarError { message: String },

    #[error("Calendar output unusable: {reason}")]
    UnusableCalendarOutput { reason: String },

    #[error("Invalid birth input '{field}': {reason}")]
    InvalidBirthInput { field: String, reason: String },

    #[error("Location table error: {message}")]
    LocationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Collaborator,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BaziError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BaziError::HttpError(_)
            | BaziError::CalendarError { .. }
            | BaziError::UnusableCalendarOutput { .. } => ErrorCategory::Collaborator,
            BaziError::InvalidBirthInput { .. } => ErrorCategory::Input,
            BaziError::ConfigError { .. }
            | BaziError::ConfigValidationError { .. }
            | BaziError::InvalidConfigValueError { .. }
            | BaziError::MissingConfigError { .. }
            | BaziError::LocationError { .. }
            | BaziError::CsvError(_) => ErrorCategory::Configuration,
            BaziError::IoError(_) | BaziError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Collaborator => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            BaziError::HttpError(_) | BaziError::CalendarError { .. } => {
                "Check that the calendar service endpoint is reachable and retry"
            }
            BaziError::UnusableCalendarOutput { .. } => {
                "Verify the calendar service returns stem/branch characters for all four pillars"
            }
            BaziError::InvalidBirthInput { .. } => {
                "Provide numeric birth year, month, day and hour within their calendar ranges"
            }
            BaziError::LocationError { .. } | BaziError::CsvError(_) => {
                "Check the location CSV has name,latitude,longitude columns"
            }
            BaziError::ConfigError { .. }
            | BaziError::ConfigValidationError { .. }
            | BaziError::InvalidConfigValueError { .. }
            | BaziError::MissingConfigError { .. } => {
                "Review the configuration file and BAZI_* environment variables"
            }
            BaziError::IoError(_) => "Check file paths and permissions",
            BaziError::SerializationError(_) => "Check that the JSON input is well formed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Collaborator => format!("Chart calculation unavailable: {}", self),
            ErrorCategory::Input => format!("Birth data rejected: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("Unexpected failure: {}", self),
        }
    }

    /// CLI 退出碼；輸入資料被拒絕也屬於失敗
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 1,
            ErrorCategory::Collaborator => 2,
            ErrorCategory::System => 3,
            ErrorCategory::Input => 4,
        }
    }

    pub(crate) fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        BaziError::InvalidBirthInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// 鏡像層錯誤，只在快取內部處理，不會傳給呼叫端
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("mirror request timed out after {0} ms")]
    Timeout(u64),

    #[error("mirror transport error: {0}")]
    Transport(String),

    #[error("mirror returned status {0}")]
    Status(u16),

    #[error("mirror payload malformed: {0}")]
    Payload(String),
}

pub type Result<T> = std::result::Result<T, BaziError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_failure_has_a_nonzero_exit_code() {
        let input = BaziError::invalid_input("birthYear", "missing");
        assert_eq!(input.exit_code(), 4);
        assert_eq!(
            BaziError::CalendarError {
                message: "down".to_string()
            }
            .exit_code(),
            2
        );
        assert_eq!(
            BaziError::MissingConfigError {
                field: "calendar.endpoint".to_string()
            }
            .exit_code(),
            1
        );
        assert_eq!(
            BaziError::IoError(std::io::Error::other("disk")).exit_code(),
            3
        );
    }

    #[test]
    fn test_severity_follows_category() {
        let input = BaziError::invalid_input("birth_year", "missing");
        assert_eq!(input.category(), ErrorCategory::Input);
        assert_eq!(input.severity(), ErrorSeverity::Low);

        let calendar = BaziError::CalendarError {
            message: "down".to_string(),
        };
        assert_eq!(calendar.severity(), ErrorSeverity::Medium);
        assert!(calendar.user_friendly_message().contains("unavailable"));

        let missing = BaziError::MissingConfigError {
            field: "mirror.url".to_string(),
        };
        assert_eq!(missing.severity(), ErrorSeverity::High);
    }
}
