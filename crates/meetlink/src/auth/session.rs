//! Turns cached or freshly obtained tokens into an [`AuthorizedClient`].

use tracing::{debug, info, warn};

use crate::client::AuthorizedClient;
use crate::config::GoogleConfig;
use crate::error::{MeetError, MeetResult};

use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// OAuth session for one Google account.
#[derive(Debug)]
pub struct Session {
    config: GoogleConfig,
    storage: TokenStorage,
    oauth: OAuthClient,
    tokens: Option<TokenInfo>,
}

impl Session {
    /// Creates a session and loads any cached tokens.
    ///
    /// An unreadable token file is treated as "not authenticated".
    pub fn new(config: GoogleConfig) -> MeetResult<Self> {
        config.validate().map_err(MeetError::configuration)?;

        let storage = TokenStorage::new(&config.token_path);
        let tokens = storage.load().unwrap_or_else(|e| {
            warn!("ignoring cached tokens: {}", e);
            None
        });
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            storage,
            oauth,
            tokens,
        })
    }

    /// Replaces the OAuth client, e.g. to point it at another token endpoint.
    pub fn with_oauth_client(mut self, oauth: OAuthClient) -> Self {
        self.oauth = oauth;
        self
    }

    /// Returns true if tokens are cached and either valid or refreshable.
    pub fn is_authenticated(&self) -> bool {
        self.tokens
            .as_ref()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }

    /// Returns true if the browser flow must run before API calls work.
    pub fn needs_reauth(&self) -> bool {
        match &self.tokens {
            None => true,
            Some(tokens) => {
                !tokens.has_scopes(&self.config.scopes)
                    || (tokens.is_expired() && tokens.refresh_token.is_none())
            }
        }
    }

    /// Runs the browser consent flow and caches the resulting tokens.
    pub async fn authenticate(&mut self) -> MeetResult<()> {
        let tokens = self
            .oauth
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;

        self.storage.save(&tokens)?;
        self.tokens = Some(tokens);
        info!("authentication successful");
        Ok(())
    }

    /// Returns a client with a usable access token, refreshing it if needed.
    ///
    /// Never opens a browser; callers decide whether to run
    /// [`authenticate`](Self::authenticate) when this fails.
    pub async fn authorized_client(&mut self) -> MeetResult<AuthorizedClient> {
        let tokens = self.tokens.as_mut().ok_or_else(|| {
            MeetError::authentication("not authenticated - run 'meetlink auth'")
        })?;

        if !tokens.has_scopes(&self.config.scopes) {
            return Err(MeetError::authentication(
                "cached tokens lack the required scopes - run 'meetlink auth --force'",
            ));
        }

        if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
                MeetError::authentication("no refresh token - re-authentication required")
            })?;

            debug!("refreshing expired access token");
            let response = self.oauth.refresh(&refresh_token).await?;
            tokens.refreshed(
                response.access_token,
                response.refresh_token,
                response.expires_in,
            );
            self.storage.save(tokens)?;
        }

        let http_client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| MeetError::init("failed to create HTTP client").with_source(e))?;

        AuthorizedClient::from_parts(
            http_client,
            tokens.access_token.clone(),
            self.config.endpoints.clone(),
        )
    }

    /// Forgets the cached tokens.
    pub fn logout(&mut self) -> MeetResult<()> {
        self.tokens = None;
        self.storage.clear()
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeetErrorCode;
    use crate::config::{MEET_SCOPES, OAuthCredentials};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::path::Path;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(token_path: &Path) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_token_path(token_path)
    }

    fn meet_scopes() -> Vec<String> {
        MEET_SCOPES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fresh_session_is_unauthenticated() {
        let tmp = tempfile::tempdir().unwrap();
        let session = Session::new(config(&tmp.path().join("tokens.json"))).unwrap();
        assert!(!session.is_authenticated());
        assert!(session.needs_reauth());
    }

    #[test]
    fn invalid_credentials_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GoogleConfig::new(OAuthCredentials::new("bad", "secret"))
            .with_token_path(tmp.path().join("tokens.json"));
        let err = Session::new(config).unwrap_err();
        assert_eq!(err.code(), MeetErrorCode::Configuration);
    }

    #[tokio::test]
    async fn authorized_client_without_tokens_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = Session::new(config(&tmp.path().join("tokens.json"))).unwrap();
        let err = session.authorized_client().await.unwrap_err();
        assert_eq!(err.code(), MeetErrorCode::Authentication);
    }

    #[tokio::test]
    async fn valid_cached_token_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        TokenStorage::new(&path)
            .save(&TokenInfo::new("cached", None, Some(3600), meet_scopes()))
            .unwrap();

        let mut session = Session::new(config(&path)).unwrap();
        assert!(session.is_authenticated());
        assert!(!session.needs_reauth());
        assert!(session.authorized_client().await.is_ok());
    }

    #[tokio::test]
    async fn missing_scope_requires_reauth() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        TokenStorage::new(&path)
            .save(&TokenInfo::new(
                "cached",
                None,
                Some(3600),
                vec![MEET_SCOPES[0].to_string()],
            ))
            .unwrap();

        let mut session = Session::new(config(&path)).unwrap();
        assert!(session.needs_reauth());
        let err = session.authorized_client().await.unwrap_err();
        assert!(err.message().contains("scopes"));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"access_token":"fresh","expires_in":3600}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        let mut stale = TokenInfo::new("stale", Some("r1".to_string()), None, meet_scopes());
        stale.expires_at = Some(Utc::now() - ChronoDuration::hours(1));
        TokenStorage::new(&path).save(&stale).unwrap();

        let oauth = OAuthClient::new(config(&path).credentials, Duration::from_secs(5))
            .unwrap()
            .with_token_url(format!("{}/token", server.uri()));
        let mut session = Session::new(config(&path)).unwrap().with_oauth_client(oauth);

        session.authorized_client().await.unwrap();

        let saved = TokenStorage::new(&path).load().unwrap().unwrap();
        assert_eq!(saved.access_token, "fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("r1"));
        assert!(!saved.is_expired());
    }

    #[test]
    fn logout_clears_tokens() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        TokenStorage::new(&path)
            .save(&TokenInfo::new("cached", None, None, meet_scopes()))
            .unwrap();

        let mut session = Session::new(config(&path)).unwrap();
        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert!(!path.exists());
    }
}
