//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::logging::TracingOutputFormat;

/// meetlink - create a Google Meet link from the terminal
#[derive(Debug, Parser)]
#[command(name = "meetlink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MEETLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t, global = true)]
    pub log_format: TracingOutputFormat,

    #[command(flatten)]
    pub google: GoogleArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the subcommand, defaulting to `create`.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Create(CreateArgs::default()))
    }
}

/// Google credentials and request settings shared by all subcommands.
#[derive(Debug, Clone, Default, Args)]
pub struct GoogleArgs {
    /// OAuth client ID (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Path to Google Cloud Console credentials JSON file
    ///
    /// This is the JSON file downloaded from the Google Cloud Console
    /// OAuth 2.0 credentials page. Alternative to providing client_id
    /// and client_secret separately.
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE", global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Where OAuth tokens are cached
    #[arg(long, global = true)]
    pub token_path: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a Google Meet link (default)
    Create(CreateArgs),

    /// Sign in with Google and cache the tokens
    Auth {
        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// Delete cached tokens
    Logout,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Output options for `create`.
#[derive(Debug, Clone, Default, Args)]
pub struct CreateArgs {
    /// Print `{"url": ...}` instead of a sentence
    #[arg(long, conflicts_with = "quiet")]
    pub json: bool,

    /// Print only the URL
    #[arg(long, short)]
    pub quiet: bool,

    /// Open the new meeting in the default browser
    #[arg(long)]
    pub open: bool,
}

/// Configuration actions.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,

    /// Dump the effective configuration
    Dump,
}
