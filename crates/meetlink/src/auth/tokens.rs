//! On-disk cache of OAuth tokens.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MeetError, MeetResult};

/// Refresh this long before Google's stated expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Bearer token for API requests.
    pub access_token: String,

    /// Long-lived token used to mint new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token stops being usable (already includes the margin).
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes that were granted.
    pub scopes: Vec<String>,

    /// When the access token was last obtained.
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Builds a token set from a token endpoint response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to be.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if every `required` scope was granted.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Swaps in a refreshed access token.
    ///
    /// Google may rotate the refresh token; a `None` keeps the current one.
    pub fn refreshed(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expires_in_secs.map(expiry_from_now);
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS)
}

/// JSON token file.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates a storage backed by `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the cached tokens. A missing file is `Ok(None)`.
    pub fn load(&self) -> MeetResult<Option<TokenInfo>> {
        if !self.path.exists() {
            debug!("no token file at {}", self.path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            MeetError::configuration("failed to read token file").with_source(e)
        })?;
        let tokens = serde_json::from_str(&content).map_err(|e| {
            MeetError::configuration("failed to parse token file").with_source(e)
        })?;

        debug!("loaded tokens from {}", self.path.display());
        Ok(Some(tokens))
    }

    /// Writes `tokens`, replacing the file atomically.
    pub fn save(&self, tokens: &TokenInfo) -> MeetResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                MeetError::configuration("failed to create token directory").with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| MeetError::internal("failed to serialize tokens").with_source(e))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            MeetError::configuration("failed to write token file").with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            MeetError::configuration("failed to rename token file").with_source(e)
        })?;

        debug!("saved tokens to {}", self.path.display());
        Ok(())
    }

    /// Removes the token file if present.
    pub fn clear(&self) -> MeetResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                MeetError::configuration("failed to remove token file").with_source(e)
            })?;
            info!("cleared tokens from {}", self.path.display());
        }
        Ok(())
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn token_expiry_includes_margin() {
        let token = TokenInfo::new("access", None, Some(30), vec![]);
        // 30s lifetime minus the 60s margin is already expired.
        assert!(token.is_expired());

        let token = TokenInfo::new("access", None, Some(3600), vec![]);
        assert!(!token.is_expired());

        let token = TokenInfo::new("access", None, None, vec![]);
        assert!(!token.is_expired());
    }

    #[test]
    fn token_scope_check() {
        let token = TokenInfo::new("access", None, None, scopes(&["a", "b"]));
        assert!(token.has_scopes(&scopes(&["a"])));
        assert!(token.has_scopes(&scopes(&["a", "b"])));
        assert!(!token.has_scopes(&scopes(&["c"])));
    }

    #[test]
    fn refresh_keeps_refresh_token_unless_rotated() {
        let mut token = TokenInfo::new("old", Some("r1".to_string()), Some(30), vec![]);
        token.refreshed("new", None, Some(3600));
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));
        assert!(!token.is_expired());

        token.refreshed("newer", Some("r2".to_string()), Some(3600));
        assert_eq!(token.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn storage_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(tmp.path().join("nested").join("tokens.json"));

        let token = TokenInfo::new("access", Some("refresh".to_string()), Some(3600), scopes(&["a"]));
        storage.save(&token).unwrap();
        assert!(storage.path().exists());

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(loaded.scopes, scopes(&["a"]));
    }

    #[cfg(unix)]
    #[test]
    fn storage_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(tmp.path().join("tokens.json"));
        storage
            .save(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn storage_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(tmp.path().join("tokens.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn storage_corrupt_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        fs::write(&path, "{ not json").unwrap();

        let err = TokenStorage::new(path).load().unwrap_err();
        assert_eq!(err.code(), crate::MeetErrorCode::Configuration);
    }

    #[test]
    fn storage_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(tmp.path().join("tokens.json"));
        storage
            .save(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        storage.clear().unwrap();
        assert!(!storage.path().exists());
        storage.clear().unwrap();
    }
}
