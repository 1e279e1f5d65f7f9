use crate::auth::{Authenticator, valid_email};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    email_address: String,
    password: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    email_address: String,
    #[serde(default)]
    password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    id: Uuid,
    email_address: String,
}

#[utoipa::path(
    post,
    path= "/register",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Registration successful"),
        (status = 400, description = "Invalid payload or a user with this email already exists"),
        (status = 500, description = "Server error"),
    ),
    tag= "auth"
)]
// axum handler for registration
#[instrument(skip(authenticator, payload))]
pub async fn register(
    authenticator: Extension<Arc<Authenticator>>,
    payload: Option<Json<RegisterRequest>>,
) -> Response {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email_address = request.email_address.as_str();
    debug!(email_address, "register");

    if !valid_email(email_address) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string()).into_response();
    }

    match authenticator
        .register(email_address, &request.password)
        .await
    {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path= "/signin",
    request_body = SignInRequest,
    responses (
        (status = 200, description = "Sign-in successful", body = SignInResponse, content_type = "application/json"),
        (status = 400, description = "Missing payload"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Server error"),
    ),
    tag= "auth"
)]
// axum handler for sign-in
#[instrument(skip(authenticator, payload))]
pub async fn sign_in(
    authenticator: Extension<Arc<Authenticator>>,
    payload: Option<Json<SignInRequest>>,
) -> Response {
    let request: SignInRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email_address = request.email_address.as_str();
    debug!(email_address, "sign in");

    match authenticator
        .sign_in(email_address, request.password.as_deref())
        .await
    {
        Ok(user) => (
            StatusCode::OK,
            Json(SignInResponse {
                id: user.id,
                email_address: user.email_address,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
