//! Route registration with automatic error funnelling.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::Request;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::{Json, Router};
use serde_json::Value;

use minuscule_core::ConfigError;

use crate::config::WebConfig;
use crate::context::RequestContext;
use crate::reporter::ErrorReporter;
use crate::step::{BoxedStep, Step};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Ok(Verb::Get),
            "post" => Ok(Verb::Post),
            "put" => Ok(Verb::Put),
            "patch" => Ok(Verb::Patch),
            "delete" | "del" => Ok(Verb::Delete),
            _ => Err(ConfigError::InvalidVerb(raw.to_string())),
        }
    }

    fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

/// Registers step chains on an axum [`Router`].
///
/// Every chain runs its steps in order against one [`RequestContext`]. The
/// first failing step is handed to the [`ErrorReporter`], which logs it and
/// answers the request; later steps never run. When every step succeeds the
/// last step's value is the response body.
///
/// Middleware added with [`Minuscule::use_step`] runs before the steps of every
/// route registered after it.
pub struct Minuscule {
    router: Router,
    middleware: Vec<BoxedStep>,
    /// Path shape to the path first registered with that shape.
    paths: HashMap<String, String>,
    registered: HashSet<(Verb, String)>,
    reporter: ErrorReporter,
    body_limit: usize,
}

impl Minuscule {
    /// Wrap `router`, the application object routes are added to.
    ///
    /// Routes already on `router` are not tracked: registering the same verb and
    /// path again makes axum panic. Add plain axum handlers through
    /// [`Minuscule::handler`] so conflicts surface as [`ConfigError`]s.
    pub fn new(router: Router, config: &WebConfig) -> Self {
        Self {
            router,
            middleware: Vec::new(),
            paths: HashMap::new(),
            registered: HashSet::new(),
            reporter: ErrorReporter::new(config),
            body_limit: config.body_limit,
        }
    }

    /// Add a middleware step for routes registered from now on.
    pub fn use_step(&mut self, step: impl Step) -> &mut Self {
        self.middleware.push(Arc::new(step));
        self
    }

    /// Register `steps` for `verb` (`get`, `post`, `put`, `patch`, `delete`) on `path`.
    pub fn route(
        &mut self,
        verb: &str,
        path: &str,
        steps: Vec<BoxedStep>,
    ) -> Result<&mut Self, ConfigError> {
        if steps.is_empty() {
            Verb::parse(verb)?;
            return Err(ConfigError::NoSteps {
                verb: verb.to_string(),
                path: path.to_string(),
            });
        }
        let parsed = self.claim(verb, path)?;

        let chain: Arc<[BoxedStep]> = self.middleware.iter().cloned().chain(steps).collect();
        tracing::debug!(verb = ?parsed, path, steps = chain.len(), "registered route");

        let reporter = self.reporter;
        let body_limit = self.body_limit;
        let handler = move |request: Request| {
            let chain = Arc::clone(&chain);
            async move { run_chain(&chain, reporter, body_limit, request).await }
        };

        self.router = std::mem::take(&mut self.router).route(path, on(parsed.filter(), handler));
        Ok(self)
    }

    pub fn get(&mut self, path: &str, steps: Vec<BoxedStep>) -> Result<&mut Self, ConfigError> {
        self.route("get", path, steps)
    }

    pub fn post(&mut self, path: &str, steps: Vec<BoxedStep>) -> Result<&mut Self, ConfigError> {
        self.route("post", path, steps)
    }

    pub fn put(&mut self, path: &str, steps: Vec<BoxedStep>) -> Result<&mut Self, ConfigError> {
        self.route("put", path, steps)
    }

    pub fn patch(&mut self, path: &str, steps: Vec<BoxedStep>) -> Result<&mut Self, ConfigError> {
        self.route("patch", path, steps)
    }

    pub fn delete(&mut self, path: &str, steps: Vec<BoxedStep>) -> Result<&mut Self, ConfigError> {
        self.route("delete", path, steps)
    }

    /// Add a plain axum handler that bypasses the step chain, with the same
    /// conflict checks as [`Minuscule::route`].
    pub fn handler<H, T>(&mut self, verb: &str, path: &str, handler: H) -> Result<&mut Self, ConfigError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let parsed = self.claim(verb, path)?;
        tracing::debug!(verb = ?parsed, path, "registered plain handler");
        self.router = std::mem::take(&mut self.router).route(path, on(parsed.filter(), handler));
        Ok(self)
    }

    /// Validate `verb` and `path` and reserve them, or report why axum would reject them.
    fn claim(&mut self, verb: &str, path: &str) -> Result<Verb, ConfigError> {
        let parsed = Verb::parse(verb)?;
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath(path.to_string()));
        }

        let shape = path_shape(path);
        if let Some(existing) = self.paths.get(&shape) {
            if existing != path {
                return Err(ConfigError::ConflictingPath {
                    path: path.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        if self.registered.contains(&(parsed, shape.clone())) {
            return Err(ConfigError::DuplicateRoute {
                verb: verb.to_string(),
                path: path.to_string(),
            });
        }

        self.paths.entry(shape.clone()).or_insert_with(|| path.to_string());
        self.registered.insert((parsed, shape));
        Ok(parsed)
    }

    /// Hand the router back for serving.
    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn run_chain(
    chain: &[BoxedStep],
    reporter: ErrorReporter,
    body_limit: usize,
    request: Request,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let mut ctx = RequestContext::from_parts(&mut parts).await;

    if let Err(err) = ctx.read_body(body, body_limit).await {
        return reporter.report(&ctx, &err);
    }

    let mut result = Value::Null;
    for step in chain {
        match step.call(&mut ctx).await {
            Ok(value) => result = value,
            Err(err) => return reporter.report(&ctx, &err),
        }
    }
    reply(result)
}

/// `path` with every `:param` and `*wildcard` segment replaced by its marker,
/// so `/x/:id` and `/x/:name` share a shape.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.chars().next() {
            Some(':') => ":",
            Some('*') => "*",
            _ => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn reply(value: Value) -> Response {
    match value {
        Value::Null => StatusCode::OK.into_response(),
        Value::String(text) => text.into_response(),
        other => Json(other).into_response(),
    }
}
