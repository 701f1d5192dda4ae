//! Declarative validation rules.
//!
//! A [`RuleSet`] maps field names to [`Rule`]s in insertion order. Order is
//! significant: a predicate may read fields accepted by earlier rules, and a
//! rule's `requires` list should name fields declared before it.
//!
//! ```ignore
//! let rules = RuleSet::new()
//!     .field("shortName", Rule::new(ValueKind::String).required())
//!     .field("prod", ValueKind::Bool)
//!     .field(
//!         "code",
//!         Rule::new(Validator::all([
//!             ValueKind::String.into(),
//!             Validator::value(|v| v.as_str().is_some_and(|s| s.starts_with('x'))),
//!         ]))
//!         .requires(["longName"]),
//!     );
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Signature of a predicate: the candidate value plus the fields validated so far.
pub type PredicateFn = dyn Fn(&Value, &Map<String, Value>) -> bool + Send + Sync;

/// JSON value shapes a field can be checked against.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    String,
    Number,
    Array,
    Object,
}

impl ValueKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ValueKind::Bool => value.is_boolean(),
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ValueKind::Bool => "a boolean",
            ValueKind::String => "a string",
            ValueKind::Number => "a number",
            ValueKind::Array => "an array",
            ValueKind::Object => "an object",
        }
    }
}

/// How a single value is checked.
///
/// Resolved when the rule is built, so evaluation is a plain match.
#[derive(Clone)]
pub enum Validator {
    Kind(ValueKind),
    Predicate(Arc<PredicateFn>),
    /// Every element must accept, in order; evaluation stops at the first rejection.
    Sequence(Vec<Validator>),
}

impl Validator {
    pub fn kind(kind: ValueKind) -> Self {
        Validator::Kind(kind)
    }

    /// Predicate with access to the fields validated before this one.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        Validator::Predicate(Arc::new(f))
    }

    /// Predicate over the value alone.
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator::predicate(move |v, _| f(v))
    }

    pub fn all(validators: impl IntoIterator<Item = Validator>) -> Self {
        Validator::Sequence(validators.into_iter().collect())
    }

    /// Returns `Ok(())` when `value` is accepted, otherwise the validator that rejected it.
    pub fn check(&self, value: &Value, ctx: &Map<String, Value>) -> Result<(), &Validator> {
        match self {
            Validator::Kind(kind) if kind.matches(value) => Ok(()),
            Validator::Predicate(f) if f(value, ctx) => Ok(()),
            Validator::Sequence(items) => items.iter().try_for_each(|v| v.check(value, ctx)),
            _ => Err(self),
        }
    }

    /// Human-readable expectation, used when a rule has no custom message.
    pub fn describe(&self) -> String {
        match self {
            Validator::Kind(kind) => kind.describe().to_string(),
            Validator::Predicate(_) => "valid".to_string(),
            Validator::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(Validator::describe).collect();
                if parts.is_empty() {
                    "valid".to_string()
                } else {
                    parts.join(" and ")
                }
            }
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Validator::Predicate(_) => f.write_str("Predicate(..)"),
            Validator::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
        }
    }
}

impl From<ValueKind> for Validator {
    fn from(kind: ValueKind) -> Self {
        Validator::Kind(kind)
    }
}

/// How one field is validated and defaulted.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) validator: Validator,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
    pub(crate) requires: Vec<String>,
    pub(crate) error: Option<String>,
}

impl Rule {
    pub fn new(validator: impl Into<Validator>) -> Self {
        Self {
            validator: validator.into(),
            required: false,
            default: None,
            requires: Vec::new(),
            error: None,
        }
    }

    /// Fail with 400 when the field is absent from the input.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value injected when the field is absent. Ignored for required fields.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Fields that must be present in the raw input for this field to be accepted.
    ///
    /// Checked against the input's keys, not the validated result: a listed field
    /// that was omitted fails even if its own rule would inject a default.
    pub fn requires<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Message sent instead of the generic one when the validator rejects.
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl From<Validator> for Rule {
    fn from(validator: Validator) -> Self {
        Rule::new(validator)
    }
}

impl From<ValueKind> for Rule {
    fn from(kind: ValueKind) -> Self {
        Rule::new(kind)
    }
}

/// Ordered mapping of field name to rule.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Accepts a full [`Rule`] or a bare validator/kind.
    pub fn field(mut self, name: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.fields.push((name.into(), rule.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reject rule sets that cannot be evaluated meaningfully.
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (name, rule) in &self.fields {
            if name.is_empty() {
                return Err(ConfigError::EmptyFieldName);
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateField(name.clone()));
            }
            if rule.requires.iter().any(|dep| dep.is_empty() || dep == name) {
                return Err(ConfigError::InvalidRequires { field: name.clone() });
            }
        }
        Ok(())
    }
}

/// A check spanning several fields, run against the validated result.
#[derive(Clone)]
pub struct CrossFieldValidator {
    check: Arc<dyn Fn(&Map<String, Value>) -> bool + Send + Sync>,
    error: String,
}

impl CrossFieldValidator {
    pub fn new<F>(error: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            error: error.into(),
        }
    }

    pub fn accepts(&self, validated: &Map<String, Value>) -> bool {
        (self.check)(validated)
    }

    pub fn error(&self) -> &str {
        &self.error
    }
}

impl fmt::Debug for CrossFieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrossFieldValidator")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
