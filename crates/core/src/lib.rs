//! `minuscule-core` — structured HTTP errors and declarative payload validation.
//!
//! This crate is intentionally decoupled from any HTTP server; the router
//! adapter lives in `minuscule-api`.

pub mod error;
pub mod rule;
pub mod validate;

pub use error::{error, ConfigError, WebError, WebResult};
pub use rule::{CrossFieldValidator, Rule, RuleSet, Validator, ValueKind};
pub use validate::validate;

pub use http::StatusCode;
