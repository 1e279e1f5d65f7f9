//! Forward geocoding against the OpenWeather direct geocoding API.
//!
//! The gateway is configured once at startup; the API key never comes from the
//! process environment at call time. Any upstream failure is reported as a
//! [`GeocodingError`], an empty result set is `Ok(vec![])`.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, debug, error, info_span, instrument};
use url::Url;
use utoipa::ToSchema;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_COUNTRY_CODE: &str = "GB";
pub const DEFAULT_LIMIT: u8 = 5;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

const DIRECT_PATH: &str = "geo/1.0/direct";

#[derive(Clone)]
pub struct GeocodingConfig {
    base_url: Url,
    api_key: SecretString,
    country_code: String,
    limit: u8,
    timeout: Duration,
}

impl GeocodingConfig {
    /// Defaults: `GB` country filter, 5 results, 10s timeout.
    #[must_use]
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    #[must_use]
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: u8) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Full request URL for `search_term`, API key included.
    ///
    /// The API path is appended to any path prefix of the base URL.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be joined with the API path.
    pub fn direct_url(&self, search_term: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut url = base.join(DIRECT_PATH)?;
        url.query_pairs_mut()
            .append_pair("q", &format!("{search_term},,{}", self.country_code))
            .append_pair("limit", &self.limit.to_string())
            .append_pair("appid", self.api_key.expose_secret());
        Ok(url)
    }
}

impl std::fmt::Debug for GeocodingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodingConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("country_code", &self.country_code)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("Search term is required")]
    EmptySearchTerm,
    #[error("Invalid geocoding URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CandidateLocation {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectResult {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl From<DirectResult> for CandidateLocation {
    fn from(result: DirectResult) -> Self {
        Self {
            label: result.name,
            latitude: result.lat,
            longitude: result.lon,
            country: result.country,
            state: result.state,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GeocodingGateway {
    client: Client,
    config: GeocodingConfig,
}

impl GeocodingGateway {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GeocodingConfig) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Candidate locations matching `search_term` within the configured country.
    ///
    /// # Errors
    /// Returns [`GeocodingError::EmptySearchTerm`] for a blank term, otherwise
    /// an error for any transport failure, non-2xx status or undecodable body.
    #[instrument(skip(self))]
    pub async fn get_locations(
        &self,
        search_term: &str,
    ) -> Result<Vec<CandidateLocation>, GeocodingError> {
        let search_term = search_term.trim();
        if search_term.is_empty() {
            return Err(GeocodingError::EmptySearchTerm);
        }

        let url = self.config.direct_url(search_term)?;
        let span = info_span!(
            "http.client",
            http.method = "GET",
            http.host = url.host_str().unwrap_or_default(),
            http.path = url.path()
        );

        let results = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await?
                .error_for_status()?;
            response.json::<Vec<DirectResult>>().await
        }
        .instrument(span)
        .await
        .map_err(|err| {
            // reqwest includes the URL, and with it the API key, in its errors.
            let err = err.without_url();
            error!("Geocoding request failed: {err}");
            GeocodingError::Request(err)
        })?;

        debug!(count = results.len(), "geocoding candidates received");

        Ok(results.into_iter().map(CandidateLocation::from).collect())
    }
}
