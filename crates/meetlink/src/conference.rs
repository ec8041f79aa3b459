//! Conference creation through a disposable calendar event.
//!
//! Google has no endpoint that just creates a Meet room. A room is allocated
//! as a side effect of inserting a calendar event whose
//! `conferenceData.createRequest` is set (with `conferenceDataVersion=1`).
//! The room outlives the event, so the event is deleted as soon as the
//! join URL has been read from the insert response.
//!
//! # Flow
//!
//! ```text
//! userinfo ──▶ insert event ──▶ extract video URL ──▶ delete event
//!   (email)     (primary,          (last video entry     (always, once
//!                version 1)         on meet.google.com)   inserted)
//! ```

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::calendar::{EventsApi, InsertedEvent, TransientEvent};
use crate::client::AuthorizedClient;
use crate::error::{MeetError, MeetResult};
use crate::identity::UserInfoApi;

/// Calendar that receives the temporary event.
pub const PRIMARY_CALENDAR_ID: &str = "primary";

/// Only video entry points on this host are accepted.
pub const GOOGLE_MEET_DOMAIN: &str = "https://meet.google.com";

/// Required for the provider to honour the conference creation request.
const CONFERENCE_DATA_VERSION: u8 = 1;

const TEMPORARY_EVENT_SUMMARY: &str = "Temporary event (will be deleted immediately)";

const TEMPORARY_EVENT_MINUTES: i64 = 10;

/// A freshly minted meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    /// The video join URL.
    pub url: String,
}

/// Creates conferences on behalf of the authenticated user.
#[derive(Debug, Clone)]
pub struct ConferenceService {
    identity: UserInfoApi,
    events: EventsApi,
}

impl ConferenceService {
    /// Builds the userinfo and calendar sub-clients.
    pub fn new(client: &AuthorizedClient) -> MeetResult<Self> {
        Ok(Self {
            identity: UserInfoApi::new(client)?,
            events: EventsApi::new(client)?,
        })
    }

    /// Starts a conference creation call.
    pub fn create(&self) -> ConferenceCreateCall<'_> {
        ConferenceCreateCall {
            service: self,
            cancel: None,
            timeout: None,
        }
    }
}

/// A single conference creation, configured fluently and run with
/// [`send`](Self::send).
#[derive(Debug)]
#[must_use = "a create call does nothing until `send` is awaited"]
pub struct ConferenceCreateCall<'a> {
    service: &'a ConferenceService,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl ConferenceCreateCall<'_> {
    /// Aborts the userinfo and insert requests when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bounds the userinfo and insert requests by an overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs the call.
    ///
    /// # Errors
    ///
    /// - `Identity` if the user's email cannot be resolved (nothing is created)
    /// - `Remote` if the event insert fails (nothing to delete)
    /// - `NotFound` if the response has no Meet video entry point
    /// - `Canceled` if the token fires or the deadline passes before the
    ///   insert completes
    ///
    /// Once the insert succeeds the event is deleted on every path. A failed
    /// delete is logged and does not change the result.
    pub async fn send(self) -> MeetResult<Conference> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let email = self
            .interruptible("looking up user", deadline, self.service.identity.email())
            .await?
            .map_err(|e| MeetError::identity("failed to get authed user info").with_source(e))?;

        let event = TransientEvent::new(
            TEMPORARY_EVENT_SUMMARY,
            email,
            Utc::now(),
            chrono::Duration::minutes(TEMPORARY_EVENT_MINUTES),
        );
        debug!("inserting temporary event, request {}", event.request_id());

        let inserted = self
            .interruptible(
                "inserting event",
                deadline,
                self.service
                    .events
                    .insert(PRIMARY_CALENDAR_ID, &event, CONFERENCE_DATA_VERSION),
            )
            .await?
            .map_err(|e| MeetError::remote("failed to insert temporary event").with_source(e))?;

        let cleanup = EventCleanup::new(self.service.events.clone(), inserted.id.clone());

        let result = match extract_meet_url(&inserted) {
            Some(url) => Ok(Conference {
                url: url.to_string(),
            }),
            None => Err(MeetError::not_found(
                "conference URL not present in response",
            )),
        };

        cleanup.finish().await;
        result
    }

    /// Runs `fut` unless the call is cancelled or out of time first.
    ///
    /// The outer error is the cancellation; the inner result is the step's own.
    async fn interruptible<T, F>(
        &self,
        stage: &str,
        deadline: Option<Instant>,
        fut: F,
    ) -> MeetResult<MeetResult<T>>
    where
        F: Future<Output = MeetResult<T>>,
    {
        let token = self.cancel.clone().unwrap_or_default();
        if token.is_cancelled() {
            return Err(MeetError::canceled(format!("canceled before {}", stage)));
        }

        let bounded = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
                    MeetError::canceled(format!("deadline exceeded while {}", stage))
                }),
                None => Ok(fut.await),
            }
        };

        // A finished step wins over a late cancellation.
        tokio::select! {
            biased;
            res = bounded => res,
            _ = token.cancelled() => {
                Err(MeetError::canceled(format!("canceled while {}", stage)))
            }
        }
    }
}

/// Picks the Meet join URL out of an inserted event.
///
/// Every entry point is scanned in response order; when several match, the
/// last one wins.
pub fn extract_meet_url(event: &InsertedEvent) -> Option<&str> {
    let entry_points = event.conference_data.as_ref()?.entry_points.as_ref()?;

    entry_points
        .iter()
        .filter(|ep| ep.entry_point_type == "video")
        .filter_map(|ep| ep.uri.as_deref())
        .filter(|uri| uri.starts_with(GOOGLE_MEET_DOMAIN))
        .fold(None, |_, uri| Some(uri))
}

/// Deletes the temporary event when the call is done with it.
///
/// Normal exits call [`finish`](Self::finish). If the call future is
/// dropped first, `Drop` hands the delete to the current runtime.
struct EventCleanup {
    events: EventsApi,
    event_id: String,
    armed: bool,
}

impl EventCleanup {
    fn new(events: EventsApi, event_id: String) -> Self {
        Self {
            events,
            event_id,
            armed: true,
        }
    }

    async fn finish(mut self) {
        self.armed = false;
        delete_quietly(&self.events, &self.event_id).await;
    }
}

impl Drop for EventCleanup {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let event_id = std::mem::take(&mut self.event_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let events = self.events.clone();
                handle.spawn(async move { delete_quietly(&events, &event_id).await });
            }
            Err(_) => warn!(
                "temporary event {} left in calendar: no runtime to delete it",
                event_id
            ),
        }
    }
}

async fn delete_quietly(events: &EventsApi, event_id: &str) {
    if let Err(e) = events.delete(PRIMARY_CALENDAR_ID, event_id).await {
        warn!("failed to delete temporary event {}: {}", event_id, e);
    }
}
