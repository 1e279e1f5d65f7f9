use crate::{
    api::{self, Services},
    auth::{Authenticator, BcryptHasher, PgUserService},
    cli::telemetry,
    geocoding::{GeocodingConfig, GeocodingGateway},
    location::{LocationRegistrar, PgLocationStore},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub max_connections: u32,
    pub geocoding_url: Url,
    pub geocoding_api_key: SecretString,
    pub geocoding_country: String,
    pub geocoding_limit: u8,
    pub geocoding_timeout_seconds: u64,
}

impl Args {
    #[must_use]
    pub fn geocoding_config(&self) -> GeocodingConfig {
        GeocodingConfig::new(self.geocoding_url.clone(), self.geocoding_api_key.clone())
            .with_country_code(self.geocoding_country.clone())
            .with_limit(self.geocoding_limit)
            .with_timeout(Duration::from_secs(self.geocoding_timeout_seconds))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let pool = api::connect(args.dsn.expose_secret(), args.max_connections).await?;

    api::apply_schema(&pool).await?;

    let geocoding = GeocodingGateway::new(args.geocoding_config())
        .context("Failed to build geocoding client")?;

    let services = Services {
        authenticator: Arc::new(Authenticator::new(
            Arc::new(PgUserService::new(pool.clone())),
            Arc::new(BcryptHasher),
        )),
        registrar: Arc::new(LocationRegistrar::new(Arc::new(PgLocationStore::new(
            pool.clone(),
        )))),
        geocoding: Arc::new(geocoding),
    };

    let result = api::new(args.port, pool, services).await;

    telemetry::shutdown_tracer();

    result
}
