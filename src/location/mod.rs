//! Saved locations keyed by their coordinate identifier.

pub mod model;
pub mod registrar;
pub mod store;

pub use self::model::{
    GeoPoint, Location, LocationFilter, LocationSubmission, NewLocation, SubmissionError,
};
pub use self::registrar::LocationRegistrar;
pub use self::store::{LocationStore, PgLocationStore};
