use crate::{
    auth::GENERIC_ERROR_MESSAGE,
    geocoding::{CandidateLocation, GeocodingError, GeocodingGateway},
    location::{Location, LocationRegistrar, LocationSubmission},
};
use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Place name to geocode
    #[serde(default)]
    q: String,
}

#[utoipa::path(
    post,
    path= "/locations",
    request_body = LocationSubmission,
    responses (
        (status = 200, description = "Stored or existing location", body = Location, content_type = "application/json"),
        (status = 400, description = "Invalid submission"),
        (status = 500, description = "Server error"),
    ),
    tag= "locations"
)]
// axum handler for saving a location
#[instrument(skip(registrar, payload))]
pub async fn add_location(
    registrar: Extension<Arc<LocationRegistrar>>,
    payload: Option<Json<LocationSubmission>>,
) -> Response {
    let submission: LocationSubmission = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if let Err(err) = submission.validate() {
        debug!("rejected submission: {err}");
        return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
    }

    match registrar.add_location(&submission).await {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(err) => {
            error!("Failed to add location: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_ERROR_MESSAGE.to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path= "/locations/search",
    params(SearchParams),
    responses (
        (status = 200, description = "Candidate locations", body = [CandidateLocation], content_type = "application/json"),
        (status = 400, description = "Search term is required"),
        (status = 500, description = "Server error"),
    ),
    tag= "locations"
)]
// axum handler for geocoding search
#[instrument(skip_all, fields(q = %params.q))]
pub async fn search_locations(
    gateway: Extension<Arc<GeocodingGateway>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match gateway.get_locations(&params.q).await {
        Ok(candidates) => (StatusCode::OK, Json(candidates)).into_response(),
        Err(GeocodingError::EmptySearchTerm) => (
            StatusCode::BAD_REQUEST,
            GeocodingError::EmptySearchTerm.to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Geocoding search failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_ERROR_MESSAGE.to_string(),
            )
                .into_response()
        }
    }
}
