use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub const POINT_TYPE: &str = "Point";

/// Point geometry, coordinates are `[longitude, latitude]`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: POINT_TYPE.to_string(),
            coordinates: [longitude, latitude],
        }
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A persisted location as reported by the store.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub label: String,
    pub lat_and_long: GeoPoint,
    pub coordinate_identifier: String,
}

/// Canonical record handed to the store for insertion.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub label: String,
    pub lat_and_long: GeoPoint,
    pub coordinate_identifier: String,
}

impl NewLocation {
    #[must_use]
    pub fn from_submission(submission: &LocationSubmission) -> Self {
        Self {
            label: submission.label.clone(),
            lat_and_long: GeoPoint::new(submission.longitude, submission.latitude),
            coordinate_identifier: submission.coordinate_identifier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationFilter {
    pub coordinate_identifier: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationSubmission {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Label is required")]
    MissingLabel,
    #[error("Latitude must be between -90 and 90")]
    LatitudeOutOfRange,
    #[error("Longitude must be between -180 and 180")]
    LongitudeOutOfRange,
}

impl LocationSubmission {
    /// `"{latitude},{longitude}"` using the shortest representation that
    /// round-trips each value, so no precision is lost or invented.
    #[must_use]
    pub fn coordinate_identifier(&self) -> String {
        coordinate_identifier(self.latitude, self.longitude)
    }

    /// # Errors
    /// Returns the first constraint the submission violates.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if self.label.trim().is_empty() {
            return Err(SubmissionError::MissingLabel);
        }

        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(SubmissionError::LatitudeOutOfRange);
        }

        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(SubmissionError::LongitudeOutOfRange);
        }

        Ok(())
    }
}

/// Signed zero is folded into `0` so `-0.0` and `0.0` share an identifier.
#[must_use]
pub fn coordinate_identifier(latitude: f64, longitude: f64) -> String {
    let (latitude, longitude) = (latitude + 0.0, longitude + 0.0);
    format!("{latitude},{longitude}")
}
