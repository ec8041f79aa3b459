//! Bearer-authenticated HTTP client shared by the API sub-clients.
//!
//! This type does not obtain or refresh tokens; see [`crate::auth`] for that.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiEndpoints;
use crate::error::{MeetError, MeetResult};

/// An HTTP client carrying a valid OAuth access token.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http_client: reqwest::Client,
    access_token: String,
    endpoints: ApiEndpoints,
}

impl AuthorizedClient {
    /// Creates a client with the given access token and the default endpoints.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> MeetResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("meetlink/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MeetError::init("failed to create HTTP client").with_source(e))?;

        Self::from_parts(http_client, access_token, ApiEndpoints::default())
    }

    /// Wraps a caller-built HTTP client.
    pub fn from_parts(
        http_client: reqwest::Client,
        access_token: impl Into<String>,
        endpoints: ApiEndpoints,
    ) -> MeetResult<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(MeetError::init("access token is empty"));
        }

        Ok(Self {
            http_client,
            access_token,
            endpoints,
        })
    }

    /// Replaces the API endpoints.
    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Returns the configured endpoints.
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Issues an authenticated GET and parses the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> MeetResult<T> {
        let request = self.http_client.get(url).query(query);
        let response = self.send(request).await?;
        Self::parse_body(response).await
    }

    /// Issues an authenticated POST with a JSON body and parses the reply.
    pub(crate) async fn post_json<B, T>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> MeetResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http_client.post(url).query(query).json(body);
        let response = self.send(request).await?;
        Self::parse_body(response).await
    }

    /// Issues an authenticated DELETE, ignoring any response body.
    pub(crate) async fn delete(&self, url: &str) -> MeetResult<()> {
        let request = self.http_client.delete(url);
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> MeetResult<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MeetError::network("request timeout").with_source(e)
                } else if e.is_connect() {
                    MeetError::network("connection failed").with_source(e)
                } else {
                    MeetError::network("request failed").with_source(e)
                }
            })?;

        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url().path());

        if status.is_success() {
            return Ok(response);
        }

        Err(Self::status_error(status, response).await)
    }

    async fn status_error(status: StatusCode, response: Response) -> MeetError {
        match status {
            StatusCode::UNAUTHORIZED => {
                MeetError::authentication("access token expired or invalid")
            }
            StatusCode::FORBIDDEN => MeetError::authorization("access denied"),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                MeetError::server(format!(
                    "rate limit exceeded{}",
                    retry_after
                        .map(|s| format!(", retry after {} seconds", s))
                        .unwrap_or_default()
                ))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                MeetError::server(format!("API error ({}): {}", status, body.trim()))
            }
        }
    }

    async fn parse_body<T: DeserializeOwned>(response: Response) -> MeetResult<T> {
        let body = response
            .text()
            .await
            .map_err(|e| MeetError::network("failed to read response").with_source(e))?;

        serde_json::from_str(&body)
            .map_err(|e| MeetError::invalid_response("failed to parse response").with_source(e))
    }
}
