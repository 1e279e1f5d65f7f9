use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

pub const GENERIC_ERROR_MESSAGE: &str = "Server error";

/// Error raised by the user service and the authenticator.
///
/// `Status` errors are caused by the client and are returned to it verbatim.
/// Anything else is `Unknown`: it is logged and answered with a generic 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Status {
        status_code: StatusCode,
        message: String,
    },
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn status(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status_code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status_code, .. } => Some(*status_code),
            Self::Unknown(_) => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            Self::Status {
                status_code,
                message,
            } => (status_code, message).into_response(),
            Self::Unknown(err) => {
                error!("Unexpected service error: {err:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_ERROR_MESSAGE.to_string(),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_error_keeps_code_and_message() {
        let err = ServiceError::status(
            StatusCode::BAD_REQUEST,
            "A user with this email already exists",
        );
        assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.to_string(), "A user with this email already exists");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_error_collapses_to_internal_server_error() {
        let err = ServiceError::from(anyhow!("relation \"users\" does not exist"));
        assert_eq!(err.status_code(), None);
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
