//! Google API configuration: credentials, scopes, endpoints.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MeetError, MeetResult};

/// OAuth scopes needed to mint a meeting link.
///
/// Reading the user's email picks the attendee of the temporary event;
/// managing events lets us insert and delete it.
pub const MEET_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Default base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Default userinfo endpoint of the OAuth2 v2 API.
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

/// Layout of a downloaded `credentials.json`.
///
/// Google nests the fields under `installed` or `web`; tools such as gcloud
/// write them flat at the root.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> MeetResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MeetError::configuration(format!(
                "failed to read credentials file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from either the nested or the flat JSON layout.
    pub fn from_json(json: &str) -> MeetResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            MeetError::configuration("failed to parse credentials JSON").with_source(e)
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(MeetError::configuration(
                "credentials file must contain an 'installed'/'web' section or root-level 'client_id'/'client_secret'",
            )),
        }
    }

    /// Checks that the credentials look like a Google OAuth client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Endpoints the sub-clients talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Calendar API base, without trailing slash.
    pub calendar_base: String,
    /// Full userinfo URL.
    pub userinfo_url: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            calendar_base: CALENDAR_API_BASE.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Points both APIs at a single server, e.g. a local mock.
    ///
    /// Paths mirror the real Google layout below `root`.
    pub fn with_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            calendar_base: format!("{}/calendar/v3", root),
            userinfo_url: format!("{}/oauth2/v2/userinfo", root),
        }
    }
}

/// Configuration for talking to Google on the user's behalf.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// Where cached OAuth tokens live.
    ///
    /// Defaults to `<data dir>/meetlink/google-tokens.json`.
    pub token_path: PathBuf,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent sent with API requests.
    pub user_agent: String,

    /// Ports tried for the OAuth loopback redirect.
    pub loopback_port_range: (u16, u16),

    /// OAuth scopes to request. Defaults to [`MEET_SCOPES`].
    pub scopes: Vec<String>,

    /// API endpoints.
    pub endpoints: ApiEndpoints,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration with defaults for everything but credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("meetlink/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: MEET_SCOPES.iter().map(|s| s.to_string()).collect(),
            endpoints: ApiEndpoints::default(),
        }
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetlink")
            .join("google-tokens.json")
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the API endpoints.
    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err("invalid loopback port range".to_string());
        }

        Ok(())
    }
}
