//! Error types and handling for webpbatch

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for webpbatch operations
pub type Result<T> = std::result::Result<T, WebpBatchError>;

/// Main error type for webpbatch operations.
///
/// Per-file encoder failures are never represented here: they are captured
/// into a [`ConversionResult`](crate::processing::ConversionResult) by the
/// worker. Everything in this enum aborts a batch before or instead of
/// dispatch.
#[derive(Debug, Error)]
pub enum WebpBatchError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid codec or driver parameters
    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    /// Destination directory could not be created
    #[error("Cannot create destination directory {path:?}: {reason}")]
    DestinationBlocked { path: PathBuf, reason: String },

    /// Source directory does not exist or is not a directory
    #[error("Source directory not found: {path:?}")]
    SourceMissing { path: PathBuf },

    /// Encoder program could not be located
    #[error("Encoder not found: {program} (is it installed and in PATH?)")]
    ToolNotFound { program: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl WebpBatchError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new invalid parameters error
    pub fn invalid_parameters<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Create a new destination blocked error
    pub fn destination_blocked<S: Into<String>>(path: PathBuf, reason: S) -> Self {
        Self::DestinationBlocked {
            path,
            reason: reason.into(),
        }
    }

    /// Create a new source missing error
    pub fn source_missing(path: PathBuf) -> Self {
        Self::SourceMissing { path }
    }

    /// Create a new tool not found error
    pub fn tool_not_found<S: Into<String>>(program: S) -> Self {
        Self::ToolNotFound {
            program: program.into(),
        }
    }

    /// Whether this error stops the whole batch.
    ///
    /// A missing encoder is only fatal for `info`; `run` still dispatches
    /// and lets every task report the spawn failure.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::IoError(_)
            | Self::ConfigError { .. }
            | Self::InvalidParameters { .. }
            | Self::DestinationBlocked { .. }
            | Self::SourceMissing { .. }
            | Self::SerdeError(_) => true,

            Self::ToolNotFound { .. } => false,
        }
    }

    /// Get the associated path if available
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::DestinationBlocked { path, .. } | Self::SourceMissing { path } => Some(path),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File system error: {}", e),
            Self::DestinationBlocked { path, reason } => format!(
                "Cannot use {} as the destination: {}. Remove what is in the way or choose another --dest.",
                path.display(),
                reason
            ),
            Self::SourceMissing { path } => {
                format!("Source directory {} does not exist. Check --source.", path.display())
            }
            Self::ToolNotFound { program } => {
                format!("Encoder '{}' was not found. Install ffmpeg or pass --encoder.", program)
            }
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for WebpBatchError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for WebpBatchError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

impl From<serde_json::Error> for WebpBatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = WebpBatchError::config("test message");
        assert!(matches!(err, WebpBatchError::ConfigError { .. }));
    }

    #[test]
    fn test_fatal_errors() {
        assert!(WebpBatchError::destination_blocked(PathBuf::from("out"), "file").is_fatal());
        assert!(!WebpBatchError::tool_not_found("ffmpeg").is_fatal());
    }

    #[test]
    fn test_user_messages() {
        let err = WebpBatchError::source_missing(PathBuf::from("raw/whiteboards"));
        let msg = err.user_message();
        assert!(msg.contains("raw/whiteboards"));
        assert!(msg.contains("--source"));
        assert_eq!(err.path(), Some(&PathBuf::from("raw/whiteboards")));

        let err = WebpBatchError::destination_blocked(
            PathBuf::from("out/nested"),
            "Not a directory (os error 20)",
        );
        let msg = err.user_message();
        assert!(msg.contains("out/nested"));
        assert!(msg.contains("Not a directory (os error 20)"));
        assert!(msg.contains("--dest"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("not = [valid");
        let err: WebpBatchError = parsed.unwrap_err().into();
        assert!(err.to_string().contains("TOML parsing error"));
    }
}
