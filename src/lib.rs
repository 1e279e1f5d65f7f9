//! # Waymark
//!
//! `waymark` is a small REST service for user accounts and saved locations.
//!
//! ## Accounts
//!
//! Registration hashes the submitted password with bcrypt (work factor 10) and
//! hands the email address and hash to a [`auth::UserService`]. Errors raised by
//! the user service either carry an explicit HTTP status, which is returned to
//! the caller verbatim, or they do not, in which case the caller only sees a
//! generic `500 Server error`.
//!
//! ## Locations
//!
//! A location is keyed by its coordinate identifier, `"{latitude},{longitude}"`.
//! Adding a location is an idempotent lookup-or-create: an existing record with
//! the same identifier is returned unchanged, otherwise a canonical record with a
//! `Point` geometry (`[longitude, latitude]`) is inserted. A unique index on the
//! identifier backs the lookup so concurrent submissions converge on one row.
//!
//! ## Geocoding
//!
//! Free-text searches are forwarded to the OpenWeather direct geocoding API,
//! restricted to one country. Upstream failures surface as a generic server
//! error, distinct from an empty result set.

pub mod api;
pub mod auth;
pub mod cli;
pub mod geocoding;
pub mod location;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
