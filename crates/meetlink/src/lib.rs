//! Mint Google Meet URLs through the Google Calendar API.
//!
//! Google exposes no direct "create a Meet room" endpoint for personal
//! accounts. Instead a calendar event is inserted with a conference
//! creation request, the Meet URL is read back from the event's
//! conference data, and the event is deleted again.
//!
//! ```text
//! userinfo (email) ──► events.insert ──► extract video URI ──► events.delete
//!                       (conferenceDataVersion=1)                (always)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use meetlink::{GoogleConfig, MeetService, OAuthCredentials, Session};
//!
//! let creds = OAuthCredentials::from_file("credentials.json")?;
//! let mut session = Session::new(GoogleConfig::new(creds))?;
//! if session.needs_reauth() {
//!     session.authenticate().await?;
//! }
//!
//! let service = MeetService::new(session.authorized_client().await?)?;
//! let conference = service.conference.create().send().await?;
//! println!("{}", conference.url);
//! ```

pub mod auth;
pub mod calendar;
pub mod client;
pub mod conference;
pub mod config;
pub mod error;
pub mod identity;
pub mod service;

pub use auth::{OAuthClient, PkceFlow, Session, TokenInfo, TokenStorage};
pub use client::AuthorizedClient;
pub use conference::{Conference, ConferenceCreateCall, ConferenceService, extract_meet_url};
pub use config::{ApiEndpoints, GoogleConfig, MEET_SCOPES, OAuthCredentials};
pub use error::{MeetError, MeetErrorCode, MeetResult};
pub use service::MeetService;
