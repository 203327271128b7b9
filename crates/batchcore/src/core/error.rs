use thiserror::Error;

/// Centralized error type for the download engine.
///
/// Everything that can fail before a yt-dlp process is running ends up here.
/// Failures reported by yt-dlp itself never become an `AppError`: they are
/// collected as plain strings by the
/// [`ErrorCollector`](crate::download::error_collector::ErrorCollector).
///
/// # Example
///
/// ```
/// use batchcore::core::error::AppError;
///
/// let err = AppError::Validation("empty request line".to_string());
/// assert_eq!(err.to_string(), "Validation error: empty request line");
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// IO errors (reading the request file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Clip range that cannot be turned into a duration
    #[error("invalid clip range '{range}': {reason}")]
    ClipRange { range: String, reason: String },
}

impl AppError {
    pub(crate) fn clip_range(range: &str, reason: impl Into<String>) -> Self {
        AppError::ClipRange {
            range: range.to_string(),
            reason: reason.into(),
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_range_display() {
        let err = AppError::clip_range("00:10-00:05", "end must be after start");
        assert_eq!(
            err.to_string(),
            "invalid clip range '00:10-00:05': end must be after start"
        );
    }

    #[test]
    fn test_io_error_converts_with_question_mark() {
        fn read_missing() -> AppResult<String> {
            Ok(std::fs::read_to_string("/nonexistent/batchdl/urls.txt")?)
        }
        assert!(matches!(read_missing(), Err(AppError::Io(_))));
    }
}
