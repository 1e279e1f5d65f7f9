//! `-v` / `WAYMARK_LOG_LEVEL` handling.

use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names, indexed by the verbosity they map to in `cli::start`.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept a level name (any case) or its index in [`LOG_LEVELS`].
///
/// # Errors
/// Returns a message listing the accepted values for anything else.
pub fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim().to_ascii_lowercase();

    let index = match level.parse::<usize>() {
        Ok(index) => Some(index).filter(|index| *index < LOG_LEVELS.len()),
        Err(_) => LOG_LEVELS.iter().position(|name| *name == level),
    };

    index
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| {
            format!(
                "invalid log level '{level}', expected 0-{} or one of: {}",
                LOG_LEVELS.len() - 1,
                LOG_LEVELS.join(", ")
            )
        })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Repeat to raise verbosity, or set the level name (default: error)")
            .env("WAYMARK_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(ValueParser::new(parse_log_level)),
    )
}
