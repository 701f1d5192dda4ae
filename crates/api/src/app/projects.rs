//! `/projects`: a small CRUD API over an in-memory store.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};

use minuscule_core::{
    validate, ConfigError, CrossFieldValidator, Rule, RuleSet, Validator, ValueKind, WebError,
};

use crate::context::RequestContext;
use crate::router::Minuscule;
use crate::step::{step, Step, StepFuture, StepResult};

static WORD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+").expect("word prefix pattern is valid"));

/// Simulated I/O latency for every handler.
const PAUSE: Duration = Duration::from_millis(10);

pub type Project = Map<String, Value>;

/// Validated `projectId` path parameter, left by [`expect_project_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectId(pub String);

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    items: Vec<Project>,
}

/// In-memory project collection shared by the handlers.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("project store lock poisoned"))
    }

    pub fn list(&self) -> anyhow::Result<Vec<Project>> {
        Ok(self.lock()?.items.clone())
    }

    pub fn find(&self, id: &str) -> anyhow::Result<Option<Project>> {
        Ok(self
            .lock()?
            .items
            .iter()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(id))
            .cloned())
    }

    /// Assign the next id to `project` and store it.
    pub fn insert(&self, mut project: Project) -> anyhow::Result<Project> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        project.insert("id".to_string(), Value::String(inner.next_id.to_string()));
        inner.items.push(project.clone());
        Ok(project)
    }

    /// Replace the project with `id`. Returns `false` when there is none.
    pub fn replace(&self, id: &str, project: Project) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        match inner
            .items
            .iter_mut()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(id))
        {
            Some(slot) => {
                *slot = project;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Field rules plus the cross-field checks for a project payload.
#[derive(Debug)]
pub struct ProjectRules {
    fields: RuleSet,
    cross: Vec<CrossFieldValidator>,
}

impl ProjectRules {
    pub fn new() -> Self {
        let fields = RuleSet::new()
            .field("shortName", Rule::new(ValueKind::String).required())
            .field("prod", ValueKind::Bool)
            .field("longName", ValueKind::String)
            .field("altName", ValueKind::String)
            // `longName` must come first: `code` depends on it.
            .field(
                "code",
                Rule::new(Validator::all([
                    ValueKind::String.into(),
                    Validator::value(|v| v.as_str().is_some_and(|s| WORD_PREFIX.is_match(s))),
                ]))
                .requires(["longName"])
                .error(r"code must be a string and must match \w+"),
            )
            .field(
                "bonusCode",
                Rule::new(Validator::all([
                    ValueKind::String.into(),
                    Validator::predicate(|_, validated| {
                        validated
                            .get("code")
                            .and_then(Value::as_str)
                            .is_some_and(|code| code.starts_with("eligible-"))
                    }),
                ]))
                .error(r#"bonusCode must be a string and "code" must start with eligible-"#),
            );

        let cross = vec![CrossFieldValidator::new(
            "At least one of longName and altName must be provided",
            |v| v.contains_key("longName") || v.contains_key("altName"),
        )];

        Self { fields, cross }
    }

    pub fn validate(&self, input: &Value) -> Result<Project, WebError> {
        validate(input, &self.fields, &self.cross)
    }
}

impl Default for ProjectRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the `/projects` routes on `app`.
pub fn register(app: &mut Minuscule, store: ProjectStore) -> Result<(), ConfigError> {
    let rules = Arc::new(ProjectRules::new());

    app.get("/projects", vec![step(ListProjects { store: store.clone() })])?;
    app.get(
        "/projects/:projectId",
        vec![step(expect_project_id), step(GetProject { store: store.clone() })],
    )?;
    app.post(
        "/projects",
        vec![step(CreateProject {
            store: store.clone(),
            rules: rules.clone(),
        })],
    )?;
    app.patch(
        "/projects/:projectId",
        vec![step(expect_project_id), step(UpdateProject { store, rules })],
    )?;
    Ok(())
}

/// Reject ids that do not start with a word character; keep the id for later steps.
pub fn expect_project_id(req: &mut RequestContext) -> StepFuture<'_> {
    Box::pin(async move {
        let id = req
            .param("projectId")
            .filter(|id| WORD_PREFIX.is_match(id))
            .map(str::to_string)
            .ok_or_else(|| {
                WebError::bad_request("projectId must contain only letters, digits and underscores")
            })?;
        req.insert(ProjectId(id));
        Ok(Value::Null)
    })
}

fn project_id(req: &RequestContext) -> anyhow::Result<String> {
    req.get::<ProjectId>()
        .map(|ProjectId(id)| id.clone())
        .ok_or_else(|| anyhow!("expect_project_id must run before this step"))
}

pub struct ListProjects {
    store: ProjectStore,
}

#[async_trait]
impl Step for ListProjects {
    async fn call(&self, _req: &mut RequestContext) -> StepResult {
        tokio::time::sleep(PAUSE).await;
        let results = self.store.list()?;
        Ok(json!({ "results": results }))
    }
}

pub struct GetProject {
    store: ProjectStore,
}

#[async_trait]
impl Step for GetProject {
    async fn call(&self, req: &mut RequestContext) -> StepResult {
        let id = project_id(req)?;
        tokio::time::sleep(PAUSE).await;
        let project = self
            .store
            .find(&id)?
            .ok_or_else(|| WebError::not_found("project not found"))?;
        Ok(Value::Object(project))
    }
}

pub struct CreateProject {
    store: ProjectStore,
    rules: Arc<ProjectRules>,
}

#[async_trait]
impl Step for CreateProject {
    async fn call(&self, req: &mut RequestContext) -> StepResult {
        let project = self.rules.validate(req.body())?;
        tokio::time::sleep(PAUSE).await;
        Ok(Value::Object(self.store.insert(project)?))
    }
}

pub struct UpdateProject {
    store: ProjectStore,
    rules: Arc<ProjectRules>,
}

#[async_trait]
impl Step for UpdateProject {
    async fn call(&self, req: &mut RequestContext) -> StepResult {
        let id = project_id(req)?;
        tokio::time::sleep(PAUSE).await;

        let mut combined = self
            .store
            .find(&id)?
            .ok_or_else(|| WebError::not_found("project not found"))?;
        let changes = req
            .body()
            .as_object()
            .ok_or_else(|| WebError::bad_request("input must be an object"))?;
        combined.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut valid = self.rules.validate(&Value::Object(combined))?;
        valid.insert("id".to_string(), Value::String(id.clone()));
        if !self.store.replace(&id, valid.clone())? {
            return Err(WebError::not_found("project not found").into());
        }
        Ok(Value::Object(valid))
    }
}
