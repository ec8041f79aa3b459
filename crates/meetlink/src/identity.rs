//! Looks up who the access token belongs to.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::client::AuthorizedClient;
use crate::error::{MeetError, MeetResult};

/// Sub-client for the OAuth2 userinfo endpoint.
#[derive(Debug, Clone)]
pub struct UserInfoApi {
    client: AuthorizedClient,
    url: String,
}

impl UserInfoApi {
    /// Creates the sub-client, checking that the endpoint is usable.
    pub fn new(client: &AuthorizedClient) -> MeetResult<Self> {
        let url = client.endpoints().userinfo_url.clone();
        Url::parse(&url).map_err(|e| {
            MeetError::init(format!("invalid userinfo URL '{}'", url)).with_source(e)
        })?;

        Ok(Self {
            client: client.clone(),
            url,
        })
    }

    /// Returns the authenticated user's email address.
    ///
    /// Only the `email` field is requested.
    pub async fn email(&self) -> MeetResult<String> {
        let info: UserInfo = self.client.get_json(&self.url, &[("fields", "email")]).await?;

        match info.email {
            Some(email) if !email.is_empty() => {
                debug!("resolved authed user {}", email);
                Ok(email)
            }
            _ => Err(MeetError::invalid_response(
                "userinfo response carries no email",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}
