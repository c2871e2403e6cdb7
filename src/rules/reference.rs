//! Splices values from the context's reference catalog into the document.
//!
//! * `"<ref>": "default"` merges the properties of `<ref>`, rendered with the
//!   current variables.
//! * `"<ref>": { vars }` does the same with `vars` layered over the current
//!   variables.
//! * `"<ref>": "a.b"` merges the properties of the object at `a.b` inside `<ref>`.
//! * `"name": "<ref>"` (and any bare `"<ref>"` value) substitutes the whole
//!   referenced value.

use serde_json::{Map, Value};
use tracing::trace;

use super::{PropertyOutcome, Rule, ValueOutcome};
use crate::catalog::Catalog;
use crate::context::Context;
use crate::engine::Engine;
use crate::errors::TransformError;
use crate::path::Path;
use crate::value::describe;

const USE_CURRENT_VARS: &str = "default";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceRule;

#[derive(Clone, Copy)]
enum Lookup<'v> {
    Current,
    Vars(&'v Map<String, Value>),
    Pick(&'v str),
}

impl ReferenceRule {
    /// Properties to merge for a `"<ref>": spec` property; `Ok(None)` when a
    /// value defect is tolerated and the property should be dropped.
    fn flatten(
        &self,
        refs: &dyn Catalog,
        key: &str,
        spec: &Value,
        cx: &Context,
        engine: &Engine,
    ) -> Result<Option<Map<String, Value>>, TransformError> {
        let lookup = match spec {
            Value::String(s) if s == USE_CURRENT_VARS => Lookup::Current,
            Value::String(path) => Lookup::Pick(path),
            Value::Object(vars) => Lookup::Vars(vars),
            other => {
                let message = format!(
                    "reference '{key}' expects \"{USE_CURRENT_VARS}\", a path or an object of variables, got {}",
                    describe(other)
                );
                return engine.policy().invalid_value(message).map(|()| None);
            }
        };

        let lookup_cx = match lookup {
            Lookup::Vars(vars) => match engine.clone_in(&Value::Object(vars.clone()), cx)? {
                Some(Value::Object(rendered)) => cx.extend(rendered),
                _ => cx.clone(),
            },
            Lookup::Current | Lookup::Pick(_) => cx.clone(),
        };

        let raw = refs.get(key)?;
        let Some(mut resolved) = engine.clone_in(&raw, &lookup_cx)? else {
            return Ok(None);
        };
        if let Lookup::Pick(path) = lookup {
            let parsed = Path::parse(path).map_err(|e| {
                TransformError::InvalidPropertyValue(format!("bad path '{path}' for reference '{key}': {e}"))
            })?;
            resolved = parsed
                .pick(&resolved)
                .cloned()
                .ok_or_else(|| TransformError::MissingPath {
                    path: path.to_string(),
                    reference: key.to_string(),
                })?;
        }

        match resolved {
            Value::Object(props) => Ok(Some(props)),
            other => {
                let message = format!("reference '{key}' resolved to {}, expected an object", describe(&other));
                engine.policy().invalid_value(message).map(|()| None)
            }
        }
    }
}

impl Rule for ReferenceRule {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn edit_property(&self, key: &str, value: &Value, cx: &Context, engine: &Engine) -> PropertyOutcome {
        let Some(refs) = cx.refs() else {
            return PropertyOutcome::Inapplicable;
        };

        if refs.has(key) {
            trace!(reference = key, "flattening reference");
            return match self.flatten(refs, key, value, cx, engine) {
                Ok(Some(props)) => PropertyOutcome::Success(props),
                Ok(None) => PropertyOutcome::Ignore,
                Err(e) => PropertyOutcome::Error(e),
            };
        }

        match value {
            Value::String(name) if refs.has(name) => match refs.get(name) {
                Ok(whole) => {
                    let mut fragment = Map::new();
                    fragment.insert(key.to_string(), whole);
                    PropertyOutcome::Success(fragment)
                }
                Err(e) => PropertyOutcome::Error(e.into()),
            },
            _ => PropertyOutcome::Inapplicable,
        }
    }

    fn edit_value(&self, value: &Value, cx: &Context, _engine: &Engine) -> ValueOutcome {
        match (value, cx.refs()) {
            (Value::String(name), Some(refs)) if refs.has(name) => match refs.get(name) {
                Ok(whole) => ValueOutcome::Success(whole),
                Err(e) => ValueOutcome::Error(e.into()),
            },
            _ => ValueOutcome::Inapplicable,
        }
    }
}
