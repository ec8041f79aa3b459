//! Command-line front end for `meetlink`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

pub use cli::Cli;
pub use error::{CliError, CliResult};
