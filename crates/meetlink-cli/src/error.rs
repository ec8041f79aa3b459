//! CLI error types.

use meetlink::MeetError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced to the user by the `meetlink` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Library failure.
    #[error(transparent)]
    Meet(#[from] MeetError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by the user.
    #[error("canceled")]
    Canceled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meet_errors_display_unchanged() {
        let err: CliError = MeetError::not_found("conference URL not present in response").into();
        assert_eq!(
            err.to_string(),
            "not_found: conference URL not present in response"
        );
    }

    #[test]
    fn config_error_display() {
        let err = CliError::Config("missing client_secret".to_string());
        assert_eq!(err.to_string(), "configuration error: missing client_secret");
    }
}
