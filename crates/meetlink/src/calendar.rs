//! Calendar events sub-client and the payloads it exchanges.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::AuthorizedClient;
use crate::error::{MeetError, MeetResult};

/// A calendar event built only to carry a conference creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransientEvent {
    pub summary: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Vec<EventAttendee>,
    pub conference_data: ConferenceDataRequest,
}

impl TransientEvent {
    /// Builds an event spanning `[start, start + duration)` with a single
    /// attendee and a fresh conference request id.
    pub fn new(
        summary: impl Into<String>,
        attendee: impl Into<String>,
        start: DateTime<Utc>,
        duration: chrono::Duration,
    ) -> Self {
        Self {
            summary: summary.into(),
            start: EventDateTime::at(start),
            end: EventDateTime::at(start + duration),
            attendees: vec![EventAttendee {
                email: attendee.into(),
            }],
            conference_data: ConferenceDataRequest {
                create_request: CreateConferenceRequest {
                    request_id: Uuid::new_v4().to_string(),
                },
            },
        }
    }

    /// The correlation id sent with the conference creation request.
    pub fn request_id(&self) -> &str {
        &self.conference_data.create_request.request_id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
}

impl EventDateTime {
    fn at(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventAttendee {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceDataRequest {
    pub create_request: CreateConferenceRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConferenceRequest {
    pub request_id: String,
}

/// The parts of an inserted event we read back.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedEvent {
    pub id: String,
    pub conference_data: Option<ConferenceData>,
}

/// Conference data as returned by the provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    pub entry_points: Option<Vec<EntryPoint>>,
}

/// One way of joining a conference (video link, phone, SIP...).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub entry_point_type: String,
    pub uri: Option<String>,
}

/// Sub-client for `calendars/{id}/events`.
#[derive(Debug, Clone)]
pub struct EventsApi {
    client: AuthorizedClient,
    base: String,
}

impl EventsApi {
    /// Creates the sub-client, checking that the base URL is usable.
    pub fn new(client: &AuthorizedClient) -> MeetResult<Self> {
        let base = client
            .endpoints()
            .calendar_base
            .trim_end_matches('/')
            .to_string();
        Url::parse(&base).map_err(|e| {
            MeetError::init(format!("invalid calendar API base '{}'", base)).with_source(e)
        })?;

        Ok(Self {
            client: client.clone(),
            base,
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base,
            urlencoding::encode(calendar_id)
        )
    }

    /// Inserts an event.
    ///
    /// The provider only honours `conferenceData.createRequest` when
    /// `conference_data_version` is 1.
    pub async fn insert(
        &self,
        calendar_id: &str,
        event: &TransientEvent,
        conference_data_version: u8,
    ) -> MeetResult<InsertedEvent> {
        let version = conference_data_version.to_string();
        let inserted: InsertedEvent = self
            .client
            .post_json(
                &self.events_url(calendar_id),
                &[("conferenceDataVersion", version.as_str())],
                event,
            )
            .await?;

        debug!(
            "inserted event {} (request {})",
            inserted.id,
            event.request_id()
        );
        Ok(inserted)
    }

    /// Deletes an event.
    pub async fn delete(&self, calendar_id: &str, event_id: &str) -> MeetResult<()> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        );
        self.client.delete(&url).await?;
        debug!("deleted event {}", event_id);
        Ok(())
    }
}
