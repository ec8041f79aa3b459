//! OAuth 2.0 authorization code flow with PKCE and a loopback redirect.
//!
//! The browser is sent to Google's consent page; Google redirects back to a
//! short-lived listener on `127.0.0.1`, which hands us the authorization
//! code. The code and the PKCE verifier are then exchanged for tokens.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::OAuthCredentials;
use crate::error::{MeetError, MeetResult};

use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Bytes of entropy in the PKCE verifier (43 chars once encoded).
const CODE_VERIFIER_LENGTH: usize = 32;

/// How long the user gets to finish the consent screen.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Talks to Google's OAuth endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    /// Creates an OAuth client.
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> MeetResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeetError::init("failed to create OAuth HTTP client").with_source(e))?;

        Ok(Self {
            credentials,
            http_client,
            token_url: GOOGLE_TOKEN_URL.to_string(),
        })
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Runs the interactive browser flow and returns fresh tokens.
    ///
    /// # Errors
    ///
    /// Fails if no loopback port in `port_range` is free, if the user denies
    /// access or does not finish within five minutes, if the CSRF state does
    /// not round-trip, or if the code exchange fails.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> MeetResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);
        let auth_url = pkce.auth_url(&self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nOpen this URL in your browser to continue:\n\n{}\n", auth_url);
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(listener))
            .await
            .map_err(|_| MeetError::authentication("timed out waiting for OAuth callback"))??;

        if callback.state != pkce.state {
            return Err(MeetError::authentication(
                "OAuth state mismatch, refusing the callback",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        let response = self
            .request_token(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", callback.code.as_str()),
                ("code_verifier", pkce.verifier.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .await?;

        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Uses a refresh token to obtain a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> MeetResult<TokenResponse> {
        let response = self
            .request_token(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        info!("refreshed access token");
        Ok(response)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> MeetResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| MeetError::network("token request failed").with_source(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MeetError::network("failed to read token response").with_source(e))?;

        if !status.is_success() {
            return Err(MeetError::authentication(format!(
                "token endpoint rejected the request ({}): {}",
                status,
                body.trim()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| MeetError::invalid_response("invalid token response").with_source(e))
    }
}

/// Body of a successful token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// RFC 7636 verifier/challenge pair plus the CSRF state.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    /// Generates a fresh verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// Builds the consent page URL.
    ///
    /// Offline access with forced consent makes Google return a refresh token
    /// every time.
    pub fn auth_url(&self, client_id: &str, redirect_uri: &str, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            GOOGLE_AUTH_URL,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

async fn bind_loopback(port_range: (u16, u16)) -> MeetResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!("loopback listener on port {}", port);
            return Ok((listener, port));
        }
    }
    Err(MeetError::configuration(format!(
        "no available port in range {}-{}",
        port_range.0, port_range.1
    )))
}

#[derive(Debug, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

/// Accepts connections until one hits `/callback`.
async fn wait_for_callback(listener: TcpListener) -> MeetResult<Callback> {
    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| MeetError::internal("loopback accept failed").with_source(e))?;
        debug!("loopback connection from {}", peer);

        if let Some(result) = handle_connection(stream).await {
            return result;
        }
    }
}

async fn handle_connection(mut stream: TcpStream) -> Option<MeetResult<Callback>> {
    let mut request_line = String::new();
    {
        let mut reader = BufReader::new(&mut stream);
        reader.read_line(&mut request_line).await.ok()?;
    }

    let target = parse_request_target(&request_line)?;
    let result = parse_callback(target);

    let page = match result {
        Ok(_) => {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization successful</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        }
        Err(_) => {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization failed</h1>\
            <p>You can close this window.</p></body></html>"
        }
    };
    let _ = stream.write_all(page.as_bytes()).await;
    let _ = stream.shutdown().await;

    Some(result)
}

/// Returns the path of a `GET /callback...` request line.
fn parse_request_target(request_line: &str) -> Option<&str> {
    let mut parts = request_line.split_whitespace();
    if parts.next()? != "GET" {
        return None;
    }
    let target = parts.next()?;
    target.starts_with("/callback").then_some(target)
}

fn parse_callback(target: &str) -> MeetResult<Callback> {
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or_default();

    let mut code = None;
    let mut state = None;
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match key {
            "error" => {
                return Err(MeetError::authentication(format!(
                    "authorization denied: {}",
                    value
                )));
            }
            "code" => code = Some(value),
            "state" => state = Some(value),
            _ => {}
        }
    }

    let code = code.ok_or_else(|| {
        MeetError::authentication("missing authorization code in callback")
    })?;
    Ok(Callback {
        code,
        state: state.unwrap_or_default(),
    })
}
