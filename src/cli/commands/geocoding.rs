use crate::geocoding::{DEFAULT_BASE_URL, DEFAULT_COUNTRY_CODE};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_GEOCODING_URL: &str = "geocoding-url";
pub const ARG_GEOCODING_API_KEY: &str = "geocoding-api-key";
pub const ARG_GEOCODING_COUNTRY: &str = "geocoding-country";
pub const ARG_GEOCODING_LIMIT: &str = "geocoding-limit";
pub const ARG_GEOCODING_TIMEOUT: &str = "geocoding-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GEOCODING_URL)
                .long(ARG_GEOCODING_URL)
                .help("Base URL of the OpenWeather geocoding API")
                .env("WAYMARK_GEOCODING_URL")
                .default_value(DEFAULT_BASE_URL),
        )
        .arg(
            Arg::new(ARG_GEOCODING_API_KEY)
                .long(ARG_GEOCODING_API_KEY)
                .help("OpenWeather API key")
                .env("OPEN_WEATHER_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GEOCODING_COUNTRY)
                .long(ARG_GEOCODING_COUNTRY)
                .help("ISO 3166 country code searches are restricted to")
                .env("WAYMARK_GEOCODING_COUNTRY")
                .default_value(DEFAULT_COUNTRY_CODE),
        )
        .arg(
            Arg::new(ARG_GEOCODING_LIMIT)
                .long(ARG_GEOCODING_LIMIT)
                .help("Maximum number of candidates per search")
                .env("WAYMARK_GEOCODING_LIMIT")
                .default_value("5")
                .value_parser(clap::value_parser!(u8).range(1..=5)),
        )
        .arg(
            Arg::new(ARG_GEOCODING_TIMEOUT)
                .long(ARG_GEOCODING_TIMEOUT)
                .help("Geocoding request timeout in seconds")
                .env("WAYMARK_GEOCODING_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub url: Url,
    pub api_key: SecretString,
    pub country: String,
    pub limit: u8,
    pub timeout_seconds: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing or the URL is invalid.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = matches
            .get_one::<String>(ARG_GEOCODING_URL)
            .context("missing required argument: --geocoding-url")?;
        let url = Url::parse(url).with_context(|| format!("invalid geocoding URL: {url}"))?;

        let api_key = matches
            .get_one::<String>(ARG_GEOCODING_API_KEY)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --geocoding-api-key")?;

        let country = matches
            .get_one::<String>(ARG_GEOCODING_COUNTRY)
            .map_or_else(|| DEFAULT_COUNTRY_CODE.to_string(), |c| c.to_uppercase());

        let limit = matches.get_one::<u8>(ARG_GEOCODING_LIMIT).copied().unwrap_or(5);
        let timeout_seconds = matches
            .get_one::<u64>(ARG_GEOCODING_TIMEOUT)
            .copied()
            .unwrap_or(10);

        Ok(Self {
            url,
            api_key,
            country,
            limit,
            timeout_seconds,
        })
    }
}
