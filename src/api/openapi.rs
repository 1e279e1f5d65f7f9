use super::handlers::{auth, health, locations};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Endpoints registered here via `.routes(routes!(...))` are both served and
/// documented. Routes added in `api::app` (`/`, `OPTIONS /health`,
/// `/openapi.json`) are not.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::register))
        .routes(routes!(auth::sign_in))
        .routes(routes!(locations::add_location))
        .routes(routes!(locations::search_locations))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Cargo.toml metadata instead of the utoipa-axum defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![
            tag("health", "Service and database status"),
            tag("auth", "Registration and sign-in"),
            tag("locations", "Saved locations and geocoding search"),
        ]))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            non_empty(name.trim()),
            non_empty(email.trim_end_matches('>').trim()),
        ),
        None => (non_empty(author.trim()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Waymark"));
            assert_eq!(contact.email.as_deref(), Some("team@waymark.dev"));
        }

        let license = spec.info.license.map(|license| license.name);
        assert_eq!(license.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn openapi_documents_every_endpoint() {
        let spec = openapi();
        for path in [
            "/health",
            "/register",
            "/signin",
            "/locations",
            "/locations/search",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }

        let tags: Vec<String> = spec
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(tags, vec!["health", "auth", "locations"]);
    }

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Ada Lovelace <ada@example.com>"),
            (Some("Ada Lovelace"), Some("ada@example.com"))
        );
        assert_eq!(parse_author("Ada"), (Some("Ada"), None));
        assert_eq!(parse_author("<ada@example.com>"), (None, Some("ada@example.com")));
    }
}
