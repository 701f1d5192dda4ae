use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, Path};
use axum::http::{header, request::Parts, Extensions, HeaderMap, Method, Uri};
use serde_json::{Map, Value};

use minuscule_core::WebError;

/// The in-flight request handed to every step of a chain.
///
/// Steps share one context per request, so an earlier step can leave typed
/// values behind (see [`RequestContext::insert`]) for the steps after it.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    client_addr: Option<SocketAddr>,
    params: HashMap<String, String>,
    body: Value,
    locals: Extensions,
}

impl RequestContext {
    /// A context with no headers, parameters or client address and an empty object body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            client_addr: None,
            params: HashMap::new(),
            body: Value::Object(Map::new()),
            locals: Extensions::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_client_addr(mut self, addr: SocketAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    /// Capture method, URI, headers, path parameters and connect info.
    ///
    /// The body is left as an empty object; see [`RequestContext::read_body`].
    pub(crate) async fn from_parts(parts: &mut Parts) -> Self {
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, &())
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        let client_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            client_addr,
            params,
            body: Value::Object(Map::new()),
            locals: Extensions::new(),
        }
    }

    /// Buffer and parse the request body into [`RequestContext::body`].
    ///
    /// Empty bodies become `{}`, url-encoded forms become an object of strings,
    /// and anything else is parsed as JSON.
    pub(crate) async fn read_body(&mut self, body: Body, limit: usize) -> anyhow::Result<()> {
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|_| WebError::bad_request("request body could not be read"))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        self.body = if self.is_form() {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(&bytes)
                .map_err(|e| WebError::bad_request(format!("malformed form body: {e}")))?;
            Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            )
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(())
    }

    fn is_form(&self) -> bool {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Peer address, if the server was started with connect info.
    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.client_addr
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Store a per-request value for later steps. Replaces any previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.locals.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.locals.get::<T>()
    }
}
