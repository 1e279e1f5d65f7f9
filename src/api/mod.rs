use crate::{
    api::handlers::{health, root},
    auth::Authenticator,
    geocoding::GeocodingGateway,
    location::LocationRegistrar,
};
use anyhow::{Context, Result};
use axum::{
    Extension, Json, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Method, Request, header::CONTENT_TYPE},
    routing::{get, options},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Instrument, Span, info, info_span, warn};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Shared handles injected into every request.
#[derive(Clone, Debug)]
pub struct Services {
    pub authenticator: Arc<Authenticator>,
    pub registrar: Arc<LocationRegistrar>,
    pub geocoding: Arc<GeocodingGateway>,
}

/// Connect to the database.
///
/// # Errors
/// Returns an error if no connection can be established.
pub async fn connect(dsn: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(max_connections)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")
}

/// Apply `sql/schema.sql`; every statement is idempotent.
///
/// # Errors
/// Returns an error if a statement fails.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    for statement in split_sql_statements(SCHEMA) {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DDL",
            db.statement = statement.as_str()
        );
        sqlx::query(&statement)
            .execute(pool)
            .instrument(span)
            .await
            .with_context(|| format!("Failed to apply schema statement: {statement}"))?;
    }

    info!("Database schema is up to date");

    Ok(())
}

/// Split a schema file on `;`, dropping `--` comments and blank statements.
fn split_sql_statements(sql: &str) -> Vec<String> {
    sql.lines()
        .map(|line| line.split_once("--").map_or(line, |(code, _)| code))
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the application: documented routes plus `/`, `OPTIONS /health` and
/// `/openapi.json`, wrapped in the request id, trace and CORS layers.
pub fn app(pool: PgPool, services: Services) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let (router, openapi) = router().split_for_parts();
    let openapi = Arc::new(openapi);

    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .route(
            "/openapi.json",
            get(move || {
                let openapi = openapi.clone();
                async move { Json(openapi.as_ref().clone()) }
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(services.authenticator))
                .layer(Extension(services.registrar))
                .layer(Extension(services.geocoding))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, pool: PgPool, services: Services) -> Result<()> {
    let app = app(pool, services);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        auth::fakes::{CreateOutcome, RecordingHasher, RecordingUserService},
        geocoding::GeocodingConfig,
        location::store::memory::MemoryLocationStore,
    };
    use axum::body::to_bytes;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;
    use uuid::Uuid;

    fn test_app() -> Router {
        // Never connects unless a handler touches the database.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://waymark@localhost:1/waymark")
            .unwrap();
        let gateway = GeocodingGateway::new(GeocodingConfig::new(
            Url::parse("http://localhost:1").unwrap(),
            SecretString::from("test-key".to_string()),
        ))
        .unwrap();

        app(
            pool,
            Services {
                authenticator: Arc::new(Authenticator::new(
                    RecordingUserService::new(CreateOutcome::Created(Uuid::new_v4()), None),
                    RecordingHasher::accepting("Passw0rd!"),
                )),
                registrar: Arc::new(LocationRegistrar::new(Arc::new(MemoryLocationStore::new()))),
                geocoding: Arc::new(gateway),
            },
        )
    }

    #[test]
    fn split_sql_statements_drops_comments_and_blanks() {
        let statements = split_sql_statements(
            "-- users\nCREATE TABLE a (id INT); -- trailing\n\n;CREATE INDEX b ON a (id);\n",
        );
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE a (id INT)".to_string(),
                "CREATE INDEX b ON a (id)".to_string()
            ]
        );
    }

    #[test]
    fn schema_has_unique_coordinate_identifier() {
        let statements = split_sql_statements(SCHEMA);
        assert!(statements.iter().any(|statement| {
            statement.contains("UNIQUE INDEX") && statement.contains("(coordinate_identifier)")
        }));
    }

    #[test]
    fn schema_compares_email_addresses_case_insensitively() {
        let statements = split_sql_statements(SCHEMA);
        assert!(statements.iter().any(|statement| {
            statement.contains("UNIQUE INDEX") && statement.contains("((lower(email_address)))")
        }));
    }

    #[tokio::test]
    async fn request_id_is_generated_and_propagated() {
        let response = test_app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let request_id = response.headers().get("x-request-id").unwrap();
        assert!(Ulid::from_string(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn request_id_is_kept_when_present() {
        let response = test_app()
            .oneshot(
                Request::get("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            &HeaderValue::from_static("abc-123")
        );
    }

    #[tokio::test]
    async fn openapi_json_is_served() {
        let response = test_app()
            .oneshot(Request::get("/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(doc["paths"]["/locations"].is_object());
    }

    #[tokio::test]
    async fn post_locations_routes_to_registrar() {
        let response = test_app()
            .oneshot(
                Request::post("/locations")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"label":"Home","latitude":51.5,"longitude":-0.12}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let location: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(location["coordinateIdentifier"], "51.5,-0.12");
    }

    #[tokio::test]
    async fn post_register_routes_to_authenticator() {
        let response = test_app()
            .oneshot(
                Request::post("/register")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"emailAddress":"ada@example.com","password":"Passw0rd!"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    }

    #[tokio::test]
    async fn post_signin_accepts_email_only_body() {
        let response = test_app()
            .oneshot(
                Request::post("/signin")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"emailAddress":"ada@example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn search_without_term_is_400() {
        let response = test_app()
            .oneshot(
                Request::get("/locations/search")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
