//! Demo application wiring (Axum router + the projects API).
//!
//! - `projects.rs`: rule set, in-memory store and steps for `/projects`
//! - `system.rs`: plain axum routes that bypass the step chain

use axum::Router;

use minuscule_core::ConfigError;

use crate::config::WebConfig;
use crate::router::Minuscule;

pub mod projects;
pub mod system;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &WebConfig) -> Result<Router, ConfigError> {
    let mut app = Minuscule::new(Router::new(), config);
    app.handler("get", "/health", system::health)?;
    projects::register(&mut app, projects::ProjectStore::new())?;

    Ok(app.into_router())
}
