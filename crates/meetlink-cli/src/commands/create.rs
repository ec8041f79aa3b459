//! `meetlink create`: mint a Meet link.

use meetlink::{
    AuthorizedClient, Conference, GoogleConfig, MeetErrorCode, MeetService, Session,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CreateArgs;
use crate::error::{CliError, CliResult};

/// Sign in if needed, create the conference and print its URL.
///
/// Ctrl-C cancels the in-flight request.
pub async fn run(args: &CreateArgs, google: GoogleConfig) -> CliResult<()> {
    let mut session = Session::new(google)?;
    let client = authorized_client(&mut session).await?;
    let service = MeetService::new(client)?;

    let token = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, canceling");
                token.cancel();
            }
        }
    });

    let result = service
        .conference
        .create()
        .with_cancellation(token.clone())
        .send()
        .await;
    ctrl_c.abort();

    let conference = result.map_err(|e| {
        if e.is_canceled() && token.is_cancelled() {
            CliError::Canceled
        } else {
            CliError::Meet(e)
        }
    })?;

    println!("{}", render(&conference, args)?);

    if args.open
        && let Err(e) = open::that(&conference.url)
    {
        warn!("failed to open {}: {}", conference.url, e);
    }

    Ok(())
}

/// Uses cached tokens, falling back to the browser flow.
async fn authorized_client(session: &mut Session) -> CliResult<AuthorizedClient> {
    match session.authorized_client().await {
        Ok(client) => Ok(client),
        Err(e) if e.code() == MeetErrorCode::Authentication => {
            info!("{}; starting browser sign-in", e.message());
            eprintln!("Sign-in required. A browser window will open to authorize access.");
            session.authenticate().await?;
            Ok(session.authorized_client().await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Formats the result line for stdout.
pub fn render(conference: &Conference, args: &CreateArgs) -> CliResult<String> {
    if args.json {
        serde_json::to_string(conference)
            .map_err(|e| CliError::Config(format!("failed to serialize result: {}", e)))
    } else if args.quiet {
        Ok(conference.url.clone())
    } else {
        Ok(format!(
            "Google Meet URL has been generated: {}",
            conference.url
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conference() -> Conference {
        Conference {
            url: "https://meet.google.com/abc-defg-hij".to_string(),
        }
    }

    #[test]
    fn render_sentence_by_default() {
        let line = render(&conference(), &CreateArgs::default()).unwrap();
        assert_eq!(
            line,
            "Google Meet URL has been generated: https://meet.google.com/abc-defg-hij"
        );
    }

    #[test]
    fn render_quiet_is_bare_url() {
        let args = CreateArgs {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(
            render(&conference(), &args).unwrap(),
            "https://meet.google.com/abc-defg-hij"
        );
    }

    #[test]
    fn render_json() {
        let args = CreateArgs {
            json: true,
            ..Default::default()
        };
        let line = render(&conference(), &args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["url"], "https://meet.google.com/abc-defg-hij");
    }
}
