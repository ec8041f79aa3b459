//! Error types for meeting link creation.
//!
//! Every failure surfaced by this crate is a [`MeetError`] carrying a
//! [`MeetErrorCode`] that tells the caller which stage went wrong, a short
//! human-readable description of that stage, and the underlying cause when
//! there is one.

use std::fmt;
use thiserror::Error;

/// The category of a meet error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetErrorCode {
    /// A sub-client could not be constructed.
    Init,
    /// Looking up the authenticated user's email failed.
    Identity,
    /// Inserting the temporary calendar event failed.
    Remote,
    /// The provider response carried no usable meeting URL.
    NotFound,
    /// The call was cancelled or its deadline elapsed.
    Canceled,
    /// Credentials are invalid or expired (401, OAuth failures).
    Authentication,
    /// The user lacks permission (403).
    Authorization,
    /// Connection failed, timed out, DNS resolution, etc.
    Network,
    /// The server returned an unexpected status.
    Server,
    /// The response body could not be parsed.
    InvalidResponse,
    /// Missing or invalid configuration, credentials or token files.
    Configuration,
    /// Unexpected internal state.
    Internal,
}

impl MeetErrorCode {
    /// Returns true if this error is transient.
    ///
    /// Nothing in this crate retries; the flag is for callers that want to.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Returns a stable snake_case name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init_error",
            Self::Identity => "identity_error",
            Self::Remote => "remote_error",
            Self::NotFound => "not_found",
            Self::Canceled => "canceled",
            Self::Authentication => "authentication_failed",
            Self::Authorization => "authorization_failed",
            Self::Network => "network_error",
            Self::Server => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::Configuration => "configuration_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for MeetErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that occurred while minting a meeting link.
#[derive(Debug, Error)]
pub struct MeetError {
    code: MeetErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl MeetError {
    /// Creates a new error with the given code and message.
    pub fn new(code: MeetErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Init, message)
    }

    /// Creates an identity lookup error.
    pub fn identity(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Identity, message)
    }

    /// Creates a remote call error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Remote, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::NotFound, message)
    }

    /// Creates a cancellation error.
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Canceled, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Authentication, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Authorization, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Network, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Server, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Configuration, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(MeetErrorCode::Internal, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> MeetErrorCode {
        self.code
    }

    /// Returns the stage description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the call was cancelled or timed out.
    pub fn is_canceled(&self) -> bool {
        self.code == MeetErrorCode::Canceled
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for MeetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

/// A specialized Result type for meet operations.
pub type MeetResult<T> = Result<T, MeetError>;
