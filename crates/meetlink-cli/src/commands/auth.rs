//! Authentication commands.

use std::path::Path;

use meetlink::{GoogleConfig, Session, TokenStorage};
use tracing::info;

use crate::error::CliResult;

/// Run the browser sign-in unless usable tokens are already cached.
pub async fn login(google: GoogleConfig, force: bool) -> CliResult<()> {
    let mut session = Session::new(google)?;

    if !force && !session.needs_reauth() {
        println!("Already authenticated with Google.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    session.authenticate().await?;

    println!();
    println!("Authentication successful!");
    println!(
        "Tokens saved to {}",
        session.config().token_path.display()
    );

    Ok(())
}

/// Delete the token cache. Needs no credentials.
pub fn logout(token_path: &Path) -> CliResult<()> {
    let storage = TokenStorage::new(token_path);
    if !storage.path().exists() {
        println!("Not signed in.");
        return Ok(());
    }

    storage.clear()?;
    info!("signed out");
    println!("Removed {}", storage.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meetlink::{MEET_SCOPES, OAuthCredentials, TokenInfo};

    #[test]
    fn logout_removes_token_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        TokenStorage::new(&path)
            .save(&TokenInfo::new("access", None, None, vec![]))
            .unwrap();

        logout(&path).unwrap();
        assert!(!path.exists());
        logout(&path).unwrap();
    }

    #[tokio::test]
    async fn login_skips_when_tokens_are_usable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tokens.json");
        let scopes = MEET_SCOPES.iter().map(|s| s.to_string()).collect();
        TokenStorage::new(&path)
            .save(&TokenInfo::new("access", None, Some(3600), scopes))
            .unwrap();

        let google = GoogleConfig::new(OAuthCredentials::new(
            "id.apps.googleusercontent.com",
            "secret",
        ))
        .with_token_path(&path);

        login(google, false).await.unwrap();
        let cached = TokenStorage::new(&path).load().unwrap().unwrap();
        assert_eq!(cached.access_token, "access");
    }
}
