//! API handlers.
//!
//! Handlers receive their collaborators through `Extension` layers installed in
//! [`crate::api::app`]; they only translate between HTTP and the services.

pub mod auth;
pub mod health;
pub mod locations;
pub mod root;
