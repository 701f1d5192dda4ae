//! Steps: the units a route chain is made of.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;

/// Outcome of one step. The value of the last step in a chain is the response body.
pub type StepResult = anyhow::Result<Value>;

/// Boxed future returned by function steps.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = StepResult> + Send + 'a>>;

/// Shared, type-erased step.
pub type BoxedStep = Arc<dyn Step>;

/// One callable unit of a request chain (middleware or terminal handler).
///
/// Return `Err` to stop the chain; the error is reported once and no later
/// step runs. Raise a [`minuscule_core::WebError`] to choose the status and a
/// client-visible message.
#[async_trait]
pub trait Step: Send + Sync + 'static {
    async fn call(&self, req: &mut RequestContext) -> StepResult;
}

/// Plain functions are steps:
///
/// ```ignore
/// fn check_id(req: &mut RequestContext) -> StepFuture<'_> {
///     Box::pin(async move { Ok(Value::Null) })
/// }
/// ```
#[async_trait]
impl<F> Step for F
where
    F: for<'a> Fn(&'a mut RequestContext) -> StepFuture<'a> + Send + Sync + 'static,
{
    async fn call(&self, req: &mut RequestContext) -> StepResult {
        (self)(req).await
    }
}

/// Box a step for registration.
pub fn step(step: impl Step) -> BoxedStep {
    Arc::new(step)
}
