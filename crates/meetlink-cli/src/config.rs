//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/meetlink/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "env::GOOGLE_CLIENT_ID"
//! client_secret = "env::GOOGLE_CLIENT_SECRET"
//! # or: credentials_file = "/path/to/credentials.json"
//! token_path = "/path/to/google-tokens.json"
//!
//! [request]
//! timeout_secs = 30
//! ```
//!
//! `client_id` and `client_secret` accept `env::VAR_NAME` references.

use std::path::{Path, PathBuf};
use std::time::Duration;

use meetlink::{GoogleConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::GoogleArgs;
use crate::error::{CliError, CliResult};

/// Looked up in the working directory when nothing else names credentials.
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Google OAuth settings.
    pub google: GoogleSettings,

    /// HTTP request settings.
    pub request: RequestSettings,
}

/// `[google]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `env::`).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `env::`).
    pub client_secret: Option<String>,

    /// Google Cloud Console credentials JSON.
    pub credentials_file: Option<PathBuf>,

    /// Token cache location.
    pub token_path: Option<PathBuf>,
}

/// `[request]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    pub timeout_secs: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CliConfig {
    /// Loads `path`, or the default file when `path` is `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    debug!("no config file at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetlink")
            .join("config.toml")
    }

    /// Token cache location: CLI flag, then config, then the library default.
    pub fn token_path(&self, args: &GoogleArgs) -> PathBuf {
        args.token_path
            .clone()
            .or_else(|| self.google.token_path.clone())
            .unwrap_or_else(GoogleConfig::default_token_path)
    }

    /// Per-request timeout: CLI flag, then config.
    pub fn timeout(&self, args: &GoogleArgs) -> Duration {
        Duration::from_secs(args.timeout.unwrap_or(self.request.timeout_secs))
    }

    /// Builds the library configuration from flags and file settings.
    pub fn google_config(&self, args: &GoogleArgs) -> CliResult<GoogleConfig> {
        let credentials =
            resolve_credentials(args, &self.google, Path::new(DEFAULT_CREDENTIALS_FILE))?;

        Ok(GoogleConfig::new(credentials)
            .with_token_path(self.token_path(args))
            .with_timeout(self.timeout(args)))
    }

    /// Copy suitable for printing: plain-text secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(secret) = &config.google.client_secret
            && !secret.starts_with("env::")
        {
            config.google.client_secret = Some("********".to_string());
        }
        config
    }
}

/// Picks OAuth credentials.
///
/// Priority (highest to lowest):
/// 1. CLI `--client-id` + `--client-secret`
/// 2. CLI `--credentials-file`
/// 3. `config.toml` `[google]` `client_id` + `client_secret`, then
///    `credentials_file`
/// 4. `fallback_file` if it exists
pub fn resolve_credentials(
    args: &GoogleArgs,
    settings: &GoogleSettings,
    fallback_file: &Path,
) -> CliResult<OAuthCredentials> {
    match (&args.client_id, &args.client_secret) {
        (Some(id), Some(secret)) => {
            debug!("using credentials from command line");
            return Ok(OAuthCredentials::new(id, secret));
        }
        (None, None) => {}
        _ => {
            return Err(CliError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
    }

    if let Some(ref path) = args.credentials_file {
        debug!("using credentials file {}", path.display());
        return load_credentials_file(path);
    }

    match (&settings.client_id, &settings.client_secret) {
        (Some(id), Some(secret)) => {
            debug!("using credentials from config file");
            let id = resolve_secret(id)
                .map_err(|e| CliError::Config(format!("failed to resolve client_id: {}", e)))?;
            let secret = resolve_secret(secret).map_err(|e| {
                CliError::Config(format!("failed to resolve client_secret: {}", e))
            })?;
            return Ok(OAuthCredentials::new(id, secret));
        }
        (Some(_), None) => {
            return Err(CliError::Config(
                "client_secret is missing from [google] section in config.toml".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(CliError::Config(
                "client_id is missing from [google] section in config.toml".to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(ref path) = settings.credentials_file {
        debug!("using credentials file {} from config", path.display());
        return load_credentials_file(path);
    }

    if fallback_file.exists() {
        debug!("using credentials file {}", fallback_file.display());
        return load_credentials_file(fallback_file);
    }

    Err(CliError::Config(format!(
        "Google credentials are required. Provide via:\n  \
         - --client-id and --client-secret flags (or GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET)\n  \
         - --credentials-file flag (path to Google Cloud Console JSON)\n  \
         - client_id + client_secret or credentials_file in {}\n  \
         - a {} file in the current directory",
        CliConfig::default_path().display(),
        DEFAULT_CREDENTIALS_FILE
    )))
}

fn load_credentials_file(path: &Path) -> CliResult<OAuthCredentials> {
    OAuthCredentials::from_file(path).map_err(|e| {
        CliError::Config(format!(
            "failed to load credentials from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Expands an `env::VAR_NAME` reference; other values pass through.
pub fn resolve_secret(value: &str) -> Result<String, String> {
    match value.strip_prefix("env::") {
        Some(var) => {
            std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
        }
        None => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDENTIALS_JSON: &str = r#"{
        "installed": {
            "client_id": "file-id.apps.googleusercontent.com",
            "client_secret": "file-secret"
        }
    }"#;

    fn no_fallback() -> PathBuf {
        PathBuf::from("/nonexistent/meetlink/credentials.json")
    }

    fn cli_args(id: Option<&str>, secret: Option<&str>) -> GoogleArgs {
        GoogleArgs {
            client_id: id.map(String::from),
            client_secret: secret.map(String::from),
            ..Default::default()
        }
    }

    fn config_settings() -> GoogleSettings {
        GoogleSettings {
            client_id: Some("config-id.apps.googleusercontent.com".to_string()),
            client_secret: Some("config-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn plain_secret_passthrough() {
        assert_eq!(resolve_secret("hello").unwrap(), "hello");
        assert_eq!(resolve_secret("").unwrap(), "");
    }

    #[test]
    fn env_secret_resolves() {
        unsafe {
            std::env::set_var("_MEETLINK_TEST_SECRET", "my-secret-value");
        }
        assert_eq!(
            resolve_secret("env::_MEETLINK_TEST_SECRET").unwrap(),
            "my-secret-value"
        );
        unsafe {
            std::env::remove_var("_MEETLINK_TEST_SECRET");
        }
    }

    #[test]
    fn env_secret_missing_var_errors() {
        let err = resolve_secret("env::_MEETLINK_NONEXISTENT_VAR_12345").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn cli_pair_wins() {
        let creds = resolve_credentials(
            &cli_args(Some("cli-id.apps.googleusercontent.com"), Some("cli-secret")),
            &config_settings(),
            &no_fallback(),
        )
        .unwrap();
        assert_eq!(creds.client_id, "cli-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "cli-secret");
    }

    #[test]
    fn partial_cli_pair_is_error() {
        let result = resolve_credentials(
            &cli_args(Some("id.apps.googleusercontent.com"), None),
            &config_settings(),
            &no_fallback(),
        );
        assert!(matches!(result, Err(CliError::Config(_))));

        let result = resolve_credentials(
            &cli_args(None, Some("secret")),
            &GoogleSettings::default(),
            &no_fallback(),
        );
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn cli_credentials_file_beats_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("creds.json");
        std::fs::write(&path, CREDENTIALS_JSON).unwrap();

        let args = GoogleArgs {
            credentials_file: Some(path),
            ..Default::default()
        };
        let creds = resolve_credentials(&args, &config_settings(), &no_fallback()).unwrap();
        assert_eq!(creds.client_id, "file-id.apps.googleusercontent.com");
    }

    #[test]
    fn config_pair_with_env_references() {
        unsafe {
            std::env::set_var("_MEETLINK_TOML_TEST_ID", "env-id.apps.googleusercontent.com");
            std::env::set_var("_MEETLINK_TOML_TEST_SECRET", "env-secret");
        }

        let config: CliConfig = toml::from_str(
            r#"
[google]
client_id = "env::_MEETLINK_TOML_TEST_ID"
client_secret = "env::_MEETLINK_TOML_TEST_SECRET"
"#,
        )
        .unwrap();
        let creds =
            resolve_credentials(&GoogleArgs::default(), &config.google, &no_fallback()).unwrap();
        assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "env-secret");

        unsafe {
            std::env::remove_var("_MEETLINK_TOML_TEST_ID");
            std::env::remove_var("_MEETLINK_TOML_TEST_SECRET");
        }
    }

    #[test]
    fn config_partial_pair_is_error() {
        let settings = GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".to_string()),
            ..Default::default()
        };
        let err = resolve_credentials(&GoogleArgs::default(), &settings, &no_fallback())
            .unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn config_credentials_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("creds.json");
        std::fs::write(&path, CREDENTIALS_JSON).unwrap();

        let settings = GoogleSettings {
            credentials_file: Some(path),
            ..Default::default()
        };
        let creds = resolve_credentials(&GoogleArgs::default(), &settings, &no_fallback()).unwrap();
        assert_eq!(creds.client_secret, "file-secret");
    }

    #[test]
    fn fallback_file_used_last() {
        let tmp = tempfile::tempdir().unwrap();
        let fallback = tmp.path().join("credentials.json");
        std::fs::write(&fallback, CREDENTIALS_JSON).unwrap();

        let creds =
            resolve_credentials(&GoogleArgs::default(), &GoogleSettings::default(), &fallback)
                .unwrap();
        assert_eq!(creds.client_id, "file-id.apps.googleusercontent.com");
    }

    #[test]
    fn no_credentials_is_error() {
        let err = resolve_credentials(
            &GoogleArgs::default(),
            &GoogleSettings::default(),
            &no_fallback(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("credentials are required"));
    }

    #[test]
    fn empty_config_has_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert!(config.google.client_id.is_none());
        assert_eq!(config.request.timeout_secs, 30);
    }

    #[test]
    fn load_missing_explicit_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let result = CliConfig::load(Some(&tmp.path().join("missing.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "[google]\ntoken_path = \"/tmp/t.json\"\n\n[request]\ntimeout_secs = 7\n",
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.google.token_path, Some(PathBuf::from("/tmp/t.json")));
        assert_eq!(config.request.timeout_secs, 7);
    }

    #[test]
    fn flags_override_file_settings() {
        let config = CliConfig {
            google: GoogleSettings {
                token_path: Some(PathBuf::from("/from/config.json")),
                ..config_settings()
            },
            request: RequestSettings { timeout_secs: 7 },
        };

        let args = GoogleArgs::default();
        assert_eq!(config.token_path(&args), PathBuf::from("/from/config.json"));
        assert_eq!(config.timeout(&args), Duration::from_secs(7));

        let args = GoogleArgs {
            token_path: Some(PathBuf::from("/from/flag.json")),
            timeout: Some(3),
            ..Default::default()
        };
        assert_eq!(config.token_path(&args), PathBuf::from("/from/flag.json"));
        assert_eq!(config.timeout(&args), Duration::from_secs(3));

        let google = config.google_config(&args).unwrap();
        assert_eq!(google.credentials.client_id, "config-id.apps.googleusercontent.com");
        assert_eq!(google.token_path, PathBuf::from("/from/flag.json"));
        assert_eq!(google.timeout, Duration::from_secs(3));
    }

    #[test]
    fn redacted_masks_plain_secret_only() {
        let config = CliConfig {
            google: config_settings(),
            ..Default::default()
        };
        assert_eq!(
            config.redacted().google.client_secret.as_deref(),
            Some("********")
        );

        let config = CliConfig {
            google: GoogleSettings {
                client_secret: Some("env::SECRET".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.redacted().google.client_secret.as_deref(),
            Some("env::SECRET")
        );
    }
}
