//! Single-pass payload validation against a [`RuleSet`].

use serde_json::{Map, Value};

use crate::error::{WebError, WebResult};
use crate::rule::{CrossFieldValidator, RuleSet};

/// Validate `input` against `rules`, then run `cross_field` over the result.
///
/// Returns only the fields named by the rule set (unknown input fields are
/// dropped), each holding the raw input value or its injected default. The
/// first failing check aborts the call:
///
/// - 400 when `input` is not an object or a value breaks a rule
/// - 500 when the rule set itself is malformed
///
/// Callers must list dependency fields before their dependents; `requires` is
/// checked against the raw input's keys.
pub fn validate(
    input: &Value,
    rules: &RuleSet,
    cross_field: &[CrossFieldValidator],
) -> WebResult<Map<String, Value>> {
    rules.check()?;

    let input = input
        .as_object()
        .ok_or_else(|| WebError::bad_request("input must be an object"))?;

    let mut output = Map::new();

    for (name, rule) in rules.iter() {
        let Some(value) = input.get(name) else {
            if rule.required {
                return Err(WebError::bad_request(format!("{name} is required")));
            }
            if let Some(default) = &rule.default {
                output.insert(name.to_string(), default.clone());
            }
            continue;
        };

        if let Some(missing) = rule.requires.iter().find(|dep| !input.contains_key(dep.as_str())) {
            return Err(WebError::bad_request(format!("{name} requires {missing}")));
        }

        if let Err(rejected) = rule.validator.check(value, &output) {
            let message = match &rule.error {
                Some(custom) => custom.clone(),
                None => format!("{name} must be {}", rejected.describe()),
            };
            tracing::debug!(field = name, %message, "validation rejected field");
            return Err(WebError::bad_request(message));
        }

        output.insert(name.to_string(), value.clone());
    }

    if let Some(failed) = cross_field.iter().find(|v| !v.accepts(&output)) {
        return Err(WebError::bad_request(failed.error()));
    }

    Ok(output)
}
