//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_MAX_CONNECTIONS, ARG_PORT, geocoding};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --dsn")?;
    let max_connections = matches
        .get_one::<u32>(ARG_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);

    let geocoding_opts = geocoding::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        max_connections,
        geocoding_url: geocoding_opts.url,
        geocoding_api_key: geocoding_opts.api_key,
        geocoding_country: geocoding_opts.country,
        geocoding_limit: geocoding_opts.limit,
        geocoding_timeout_seconds: geocoding_opts.timeout_seconds,
    }))
}
