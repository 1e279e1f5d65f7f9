//! Location persistence.
//!
//! The registrar only needs two primitives from the store: an exact-match
//! lookup on the coordinate identifier and an insert. `create` returns
//! `Ok(None)` when another writer already inserted the same identifier, which
//! lets the registrar recover from the lookup-then-insert race instead of
//! failing the request.

use super::model::{GeoPoint, Location, LocationFilter, NewLocation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Return the record matching `filter`, if any.
    async fn find_one(&self, filter: &LocationFilter) -> Result<Option<Location>>;

    /// Insert `location`, returning the stored record, or `None` when a record
    /// with the same coordinate identifier already exists.
    async fn create(&self, location: &NewLocation) -> Result<Option<Location>>;
}

#[derive(Clone, Debug)]
pub struct PgLocationStore {
    pool: PgPool,
}

impl PgLocationStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for PgLocationStore {
    async fn find_one(&self, filter: &LocationFilter) -> Result<Option<Location>> {
        let query = r"
            SELECT id, label, longitude, latitude, coordinate_identifier
            FROM locations
            WHERE coordinate_identifier = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(&filter.coordinate_identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("Failed to look up location")?;

        row.as_ref().map(location_from_row).transpose()
    }

    async fn create(&self, location: &NewLocation) -> Result<Option<Location>> {
        let query = r"
            INSERT INTO locations (label, longitude, latitude, coordinate_identifier)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (coordinate_identifier) DO NOTHING
            RETURNING id, label, longitude, latitude, coordinate_identifier
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        let row = sqlx::query(query)
            .bind(&location.label)
            .bind(location.lat_and_long.longitude())
            .bind(location.lat_and_long.latitude())
            .bind(&location.coordinate_identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("Failed to insert location")?;

        row.as_ref().map(location_from_row).transpose()
    }
}

fn location_from_row(row: &PgRow) -> Result<Location> {
    let longitude: f64 = row.try_get("longitude")?;
    let latitude: f64 = row.try_get("latitude")?;

    Ok(Location {
        id: row.try_get("id")?,
        label: row.try_get("label")?,
        lat_and_long: GeoPoint::new(longitude, latitude),
        coordinate_identifier: row.try_get("coordinate_identifier")?,
    })
}

/// In-memory store used by unit tests.
#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Barrier, RwLock};
    use uuid::Uuid;

    #[derive(Debug, Default)]
    pub(crate) struct MemoryLocationStore {
        records: RwLock<Vec<Location>>,
        lookups: AtomicUsize,
        inserts: AtomicUsize,
        lookup_barrier: Option<(Barrier, usize)>,
    }

    impl MemoryLocationStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Every lookup waits until `parties` lookups are in flight, forcing
        /// concurrent callers to all observe the same (empty) state.
        pub(crate) fn with_lookup_barrier(parties: usize) -> Self {
            Self {
                lookup_barrier: Some((Barrier::new(parties), parties)),
                ..Self::default()
            }
        }

        pub(crate) async fn len(&self) -> usize {
            self.records.read().await.len()
        }

        pub(crate) fn inserts(&self) -> usize {
            self.inserts.load(Ordering::SeqCst)
        }

        pub(crate) fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LocationStore for MemoryLocationStore {
        async fn find_one(&self, filter: &LocationFilter) -> Result<Option<Location>> {
            let found = self
                .records
                .read()
                .await
                .iter()
                .find(|record| record.coordinate_identifier == filter.coordinate_identifier)
                .cloned();

            // Only the first round of lookups is synchronized.
            let seen = self.lookups.fetch_add(1, Ordering::SeqCst);
            if let Some((barrier, parties)) = &self.lookup_barrier {
                if seen < *parties {
                    barrier.wait().await;
                }
            }

            Ok(found)
        }

        async fn create(&self, location: &NewLocation) -> Result<Option<Location>> {
            self.inserts.fetch_add(1, Ordering::SeqCst);

            let mut records = self.records.write().await;
            if records
                .iter()
                .any(|record| record.coordinate_identifier == location.coordinate_identifier)
            {
                return Ok(None);
            }

            let record = Location {
                id: Uuid::new_v4(),
                label: location.label.clone(),
                lat_and_long: location.lat_and_long.clone(),
                coordinate_identifier: location.coordinate_identifier.clone(),
            };
            records.push(record.clone());

            Ok(Some(record))
        }
    }
}
