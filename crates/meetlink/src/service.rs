//! Entry point bundling the API services.

use crate::client::AuthorizedClient;
use crate::conference::ConferenceService;
use crate::error::{MeetError, MeetResult};

/// Top-level handle over the Meet-related services.
///
/// ```ignore
/// let service = MeetService::new(client)?;
/// let conference = service.conference.create().send().await?;
/// println!("{}", conference.url);
/// ```
#[derive(Debug, Clone)]
pub struct MeetService {
    /// Conference creation.
    pub conference: ConferenceService,
}

impl MeetService {
    /// Builds every service from one authorized client.
    pub fn new(client: AuthorizedClient) -> MeetResult<Self> {
        let conference = ConferenceService::new(&client).map_err(|e| {
            MeetError::init("failed to initialize conference service").with_source(e)
        })?;

        Ok(Self { conference })
    }
}
