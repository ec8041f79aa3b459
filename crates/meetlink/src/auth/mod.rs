//! OAuth2 sign-in for installed applications.
//!
//! [`Session`] owns the token cache and hands out [`AuthorizedClient`]s,
//! refreshing the access token when it has expired. The browser flow
//! ([`OAuthClient::authorize`]) is only run on explicit request.
//!
//! [`AuthorizedClient`]: crate::client::AuthorizedClient

pub mod oauth;
pub mod session;
pub mod tokens;

pub use oauth::{OAuthClient, PkceFlow, TokenResponse};
pub use session::Session;
pub use tokens::{TokenInfo, TokenStorage};
