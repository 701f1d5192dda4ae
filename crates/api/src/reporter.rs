//! Uniform error logging and response path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use minuscule_core::WebError;

use crate::config::WebConfig;
use crate::context::RequestContext;

/// Body sent for failures that carry no explicit status.
const GENERIC_BODY: &str = "error";

/// Logs a failed request once and turns the error into its response.
#[derive(Debug, Copy, Clone)]
pub struct ErrorReporter {
    production: bool,
}

impl ErrorReporter {
    pub fn new(config: &WebConfig) -> Self {
        Self {
            production: config.production,
        }
    }

    /// Status for `err` and, when the status was chosen deliberately, the
    /// message the client may see.
    ///
    /// Deserialization failures (`serde_json::Error`) are treated as client
    /// faults, the same way a validation library's error would be.
    pub fn classify(err: &anyhow::Error) -> (StatusCode, Option<String>) {
        if let Some(web) = err.chain().find_map(|e| e.downcast_ref::<WebError>()) {
            return (web.status(), Some(web.message().to_string()));
        }
        if let Some(json) = err.chain().find_map(|e| e.downcast_ref::<serde_json::Error>()) {
            return (StatusCode::BAD_REQUEST, Some(json.to_string()));
        }
        (StatusCode::INTERNAL_SERVER_ERROR, None)
    }

    /// Emit one structured log record for `err` and build the single response for it.
    pub fn report(&self, req: &RequestContext, err: &anyhow::Error) -> Response {
        let (status, public) = Self::classify(err);
        let ip = req
            .client_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_string());
        let at = Utc::now().timestamp_millis();

        if self.production {
            tracing::error!(
                url = %req.uri(),
                method = %req.method(),
                ip = %ip,
                at,
                status = status.as_u16(),
                "{err:#}"
            );
        } else {
            tracing::error!(
                url = %req.uri(),
                method = %req.method(),
                ip = %ip,
                at,
                status = status.as_u16(),
                trace = ?err,
                "{err:#}"
            );
        }

        match public {
            Some(message) => (status, message).into_response(),
            None => (status, GENERIC_BODY).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Uri};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn report_captured(production: bool, err: anyhow::Error) -> (Response, String) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        let reporter = ErrorReporter::new(&WebConfig {
            production,
            ..WebConfig::default()
        });
        let ctx = RequestContext::new(Method::GET, Uri::from_static("/projects/7"))
            .with_client_addr(([10, 0, 0, 1], 4000).into());

        let response = tracing::subscriber::with_default(subscriber, || reporter.report(&ctx, &err));
        (response, captured.contents())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn explicit_status_is_sent_with_its_message() {
        let (response, log) = report_captured(false, WebError::not_found("project not found").into());

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "project not found");
        assert!(log.contains("\"status\":404"));
        assert!(log.contains("/projects/7"));
        assert!(log.contains("10.0.0.1"));
    }

    #[tokio::test]
    async fn unclassified_errors_hide_their_message() {
        let (response, log) = report_captured(false, anyhow::anyhow!("disk on fire"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "error");
        assert!(log.contains("disk on fire"));
        assert!(log.contains("\"status\":500"));
    }

    #[tokio::test]
    async fn serde_errors_are_client_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let (response, _) = report_captured(true, err.into());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn context_wrapped_errors_log_the_client_message() {
        let err = anyhow::Error::from(WebError::bad_request("id must be numeric"))
            .context("while checking id");
        let (response, log) = report_captured(true, err);

        assert_eq!(body_text(response).await, "id must be numeric");
        assert!(log.contains("while checking id: id must be numeric"));
    }

    #[test]
    fn context_wrapped_web_errors_keep_their_status() {
        let err = anyhow::Error::from(WebError::bad_request("bad")).context("while checking id");
        assert_eq!(
            ErrorReporter::classify(&err),
            (StatusCode::BAD_REQUEST, Some("bad".to_string()))
        );
    }

    #[test]
    fn only_development_logs_carry_the_trace() {
        let (_, dev) = report_captured(false, anyhow::anyhow!("boom"));
        let (_, prod) = report_captured(true, anyhow::anyhow!("boom"));

        assert!(dev.contains("\"trace\""));
        assert!(!prod.contains("\"trace\""));
        assert!(prod.contains("boom"));
    }
}
