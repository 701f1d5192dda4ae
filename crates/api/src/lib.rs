//! HTTP API: route registration with uniform error handling, on top of axum.

pub mod app;
pub mod config;
pub mod context;
pub mod reporter;
pub mod router;
pub mod step;

pub use config::WebConfig;
pub use context::RequestContext;
pub use reporter::ErrorReporter;
pub use router::Minuscule;
pub use step::{step, BoxedStep, Step, StepFuture, StepResult};

pub use minuscule_core::{
    error, validate, ConfigError, CrossFieldValidator, Rule, RuleSet, Validator, ValueKind,
    WebError, WebResult,
};
