use super::{
    model::{Location, LocationFilter, LocationSubmission, NewLocation},
    store::LocationStore,
};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Lookup-or-create entry point for saved locations.
#[derive(Clone)]
pub struct LocationRegistrar {
    store: Arc<dyn LocationStore>,
}

impl LocationRegistrar {
    #[must_use]
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        Self { store }
    }

    /// Return the stored record for the submission's coordinates, inserting a
    /// canonical record first when none exists.
    ///
    /// An existing record is returned as stored; a different `label` in the
    /// submission is ignored. Store failures are returned as-is.
    ///
    /// # Errors
    /// Returns the store's error if the lookup or the insert fails.
    #[instrument(skip(self, submission), fields(label = %submission.label))]
    pub async fn add_location(&self, submission: &LocationSubmission) -> Result<Location> {
        let filter = LocationFilter {
            coordinate_identifier: submission.coordinate_identifier(),
        };

        if let Some(existing) = self.store.find_one(&filter).await? {
            debug!(id = %existing.id, "location already registered");
            return Ok(existing);
        }

        let record = NewLocation::from_submission(submission);
        if let Some(created) = self.store.create(&record).await? {
            debug!(id = %created.id, "location registered");
            return Ok(created);
        }

        // Lost the race against a concurrent insert of the same identifier.
        debug!(
            coordinate_identifier = %filter.coordinate_identifier,
            "location inserted concurrently, reading it back"
        );
        self.store.find_one(&filter).await?.ok_or_else(|| {
            anyhow!(
                "location {} conflicted on insert but could not be read back",
                filter.coordinate_identifier
            )
        })
    }
}

impl std::fmt::Debug for LocationRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRegistrar").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::location::{
        model::{GeoPoint, POINT_TYPE},
        store::memory::MemoryLocationStore,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    const LATITUDE: f64 = 52.568_241_860_351_62;
    const LONGITUDE: f64 = -0.245_178_187_001_430_68;
    const IDENTIFIER: &str = "52.56824186035162,-0.24517818700143068";

    fn submission() -> LocationSubmission {
        LocationSubmission {
            label: "Peterborough".to_string(),
            latitude: LATITUDE,
            longitude: LONGITUDE,
        }
    }

    fn stored(label: &str) -> Location {
        Location {
            id: Uuid::new_v4(),
            label: label.to_string(),
            lat_and_long: GeoPoint::new(LONGITUDE, LATITUDE),
            coordinate_identifier: IDENTIFIER.to_string(),
        }
    }

    enum Lookup {
        Found(Location),
        Missing,
        Fails,
    }

    enum Insert {
        EchoWithId(Uuid),
        Fails,
    }

    /// Store fake that records every call and answers from a script.
    struct ScriptedStore {
        lookup: Lookup,
        insert: Insert,
        lookups: Mutex<Vec<LocationFilter>>,
        inserts: Mutex<Vec<NewLocation>>,
    }

    impl ScriptedStore {
        fn new(lookup: Lookup, insert: Insert) -> Arc<Self> {
            Arc::new(Self {
                lookup,
                insert,
                lookups: Mutex::new(Vec::new()),
                inserts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LocationStore for ScriptedStore {
        async fn find_one(&self, filter: &LocationFilter) -> Result<Option<Location>> {
            self.lookups.lock().unwrap().push(filter.clone());
            match &self.lookup {
                Lookup::Found(location) => Ok(Some(location.clone())),
                Lookup::Missing => Ok(None),
                Lookup::Fails => Err(anyhow!("connection reset")),
            }
        }

        async fn create(&self, location: &NewLocation) -> Result<Option<Location>> {
            self.inserts.lock().unwrap().push(location.clone());
            match &self.insert {
                Insert::EchoWithId(id) => Ok(Some(Location {
                    id: *id,
                    label: location.label.clone(),
                    lat_and_long: location.lat_and_long.clone(),
                    coordinate_identifier: location.coordinate_identifier.clone(),
                })),
                Insert::Fails => Err(anyhow!("disk full")),
            }
        }
    }

    #[tokio::test]
    async fn looks_up_by_coordinate_identifier() {
        let store = ScriptedStore::new(Lookup::Missing, Insert::EchoWithId(Uuid::new_v4()));
        let registrar = LocationRegistrar::new(store.clone());

        registrar.add_location(&submission()).await.unwrap();

        let lookups = store.lookups.lock().unwrap();
        assert_eq!(
            lookups.first(),
            Some(&LocationFilter {
                coordinate_identifier: IDENTIFIER.to_string()
            })
        );
    }

    #[tokio::test]
    async fn returns_existing_record_without_inserting() {
        let existing = stored("Peterborough");
        let store = ScriptedStore::new(
            Lookup::Found(existing.clone()),
            Insert::EchoWithId(Uuid::new_v4()),
        );
        let registrar = LocationRegistrar::new(store.clone());

        let result = registrar.add_location(&submission()).await.unwrap();

        assert_eq!(result, existing);
        assert!(store.inserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_label_is_not_merged() {
        let existing = stored("City of Peterborough");
        let store = ScriptedStore::new(
            Lookup::Found(existing.clone()),
            Insert::EchoWithId(Uuid::new_v4()),
        );
        let registrar = LocationRegistrar::new(store);

        let result = registrar.add_location(&submission()).await.unwrap();

        assert_eq!(result.label, "City of Peterborough");
    }

    #[tokio::test]
    async fn lookup_failure_propagates_without_insert() {
        let store = ScriptedStore::new(Lookup::Fails, Insert::EchoWithId(Uuid::new_v4()));
        let registrar = LocationRegistrar::new(store.clone());

        let result = registrar.add_location(&submission()).await;

        assert_eq!(
            result.map_err(|err| err.to_string()).err().as_deref(),
            Some("connection reset")
        );
        assert!(store.inserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn inserts_canonical_record_when_missing() {
        let store = ScriptedStore::new(Lookup::Missing, Insert::EchoWithId(Uuid::new_v4()));
        let registrar = LocationRegistrar::new(store.clone());

        registrar.add_location(&submission()).await.unwrap();

        let inserts = store.inserts.lock().unwrap();
        assert_eq!(inserts.len(), 1);
        assert_eq!(
            inserts.first(),
            Some(&NewLocation {
                label: "Peterborough".to_string(),
                lat_and_long: GeoPoint {
                    kind: POINT_TYPE.to_string(),
                    coordinates: [LONGITUDE, LATITUDE],
                },
                coordinate_identifier: IDENTIFIER.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn returns_record_reported_by_store() {
        let id = Uuid::new_v4();
        let store = ScriptedStore::new(Lookup::Missing, Insert::EchoWithId(id));
        let registrar = LocationRegistrar::new(store);

        let result = registrar.add_location(&submission()).await.unwrap();

        assert_eq!(result.id, id);
        assert_eq!(result.label, "Peterborough");
        assert_eq!(result.lat_and_long.coordinates, [LONGITUDE, LATITUDE]);
        assert_eq!(result.coordinate_identifier, IDENTIFIER);
    }

    #[tokio::test]
    async fn insert_failure_propagates() {
        let store = ScriptedStore::new(Lookup::Missing, Insert::Fails);
        let registrar = LocationRegistrar::new(store);

        let result = registrar.add_location(&submission()).await;

        assert_eq!(
            result.map_err(|err| err.to_string()).err().as_deref(),
            Some("disk full")
        );
    }

    #[tokio::test]
    async fn repeated_submissions_share_one_record() {
        let store = Arc::new(MemoryLocationStore::new());
        let registrar = LocationRegistrar::new(store.clone());

        let first = registrar.add_location(&submission()).await.unwrap();
        let second = registrar
            .add_location(&LocationSubmission {
                label: "Somewhere else".to_string(),
                ..submission()
            })
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.inserts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_submissions_converge_on_one_record() {
        let store = Arc::new(MemoryLocationStore::with_lookup_barrier(2));
        let registrar = LocationRegistrar::new(store.clone());

        let left = {
            let registrar = registrar.clone();
            tokio::spawn(async move { registrar.add_location(&submission()).await })
        };
        let right = {
            let registrar = registrar.clone();
            tokio::spawn(async move { registrar.add_location(&submission()).await })
        };

        let left = left.await.unwrap().unwrap();
        let right = right.await.unwrap().unwrap();

        assert_eq!(left, right);
        assert_eq!(store.len().await, 1);
        // Both callers saw an empty store, so both attempted the insert.
        assert_eq!(store.inserts(), 2);
        assert_eq!(store.lookups(), 3);
    }
}
