use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotationError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Telegram API call '{method}' failed: {description}")]
    TelegramApiError { method: String, description: String },

    #[error("Every member declined this round ({declined} declines)")]
    SelectionExhausted { declined: usize },

    #[error("'{username}' is not a member of the roster")]
    UnknownMember { username: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Rotation,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RotationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::TelegramApiError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::SelectionExhausted { .. } | Self::UnknownMember { .. } => {
                ErrorCategory::Rotation
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 整輪都被拒絕，下一次排程會重試
            Self::SelectionExhausted { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::TelegramApiError { .. } => ErrorSeverity::Medium,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownMember { .. } => ErrorSeverity::High,
            Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::ApiError(_) => {
                "Check network connectivity to the Telegram API and retry".to_string()
            }
            Self::TelegramApiError { .. } => {
                "Verify the bot token and that the bot is a member of the group chat".to_string()
            }
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Fix the configuration file and restart the bot".to_string()
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the configuration file", field)
            }
            Self::MissingConfigError { field } => {
                format!("Add the '{}' field to the configuration file", field)
            }
            Self::SelectionExhausted { .. } => {
                "Nobody can host this week; the next scheduled round will ask everyone again"
                    .to_string()
            }
            Self::UnknownMember { username } => {
                format!("Add '{}' to the members list if they should host", username)
            }
            Self::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach Telegram: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Rotation => format!("Host rotation problem: {}", self),
            ErrorCategory::System => format!("Internal error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustion_is_low_severity_rotation_error() {
        let err = RotationError::SelectionExhausted { declined: 3 };
        assert_eq!(err.category(), ErrorCategory::Rotation);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.to_string().contains("3 declines"));
    }

    #[test]
    fn test_config_errors_are_high_severity() {
        let err = RotationError::MissingConfigError {
            field: "bot_token".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("bot_token"));
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }
}
