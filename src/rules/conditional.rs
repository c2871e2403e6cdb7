//! `?`-prefixed keys that include their object body only when a condition holds.
//!
//! ```text
//! "?env=prod":  { ... }   included when `env` is "prod"
//! "?region":    { ... }   included when `region` is non-empty
//! "?default":   { ... }   included unless a condition since the previous
//!                         default matched
//! "?a=b # why": { ... }   everything after `#` is a comment
//! ```
//!
//! A bare left operand that names a bound variable stands for that variable's
//! value; any other bare operand is taken literally. Operands carrying markers
//! are rendered here and compared as written, so `"?{{env}}=prod"` checks the
//! value of `env` even when a variable happens to be called `prod`.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Deferred, FinalizeOutcome, PropertyOutcome, Rule};
use crate::config::Policy;
use crate::context::{Context, Vars};
use crate::engine::Engine;
use crate::errors::{RenderError, TransformError};
use crate::render::{MustacheRenderer, Renderer};
use crate::value::{describe, to_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Default,
    Match { lhs: String, rhs: String },
    Defined(String),
}

impl Condition {
    /// `Ok(None)` for keys that are not conditionals at all.
    pub fn parse(key: &str) -> Result<Option<Condition>, TransformError> {
        let Some(body) = key.strip_prefix('?') else {
            return Ok(None);
        };
        let body = body.split('#').next().unwrap_or_default().trim();
        if body == "default" {
            return Ok(Some(Condition::Default));
        }
        let parts: Vec<&str> = body.split('=').collect();
        match parts.as_slice() {
            [token] => Ok(Some(Condition::Defined(token.trim().to_string()))),
            [lhs, rhs] => Ok(Some(Condition::Match {
                lhs: lhs.trim().to_string(),
                rhs: rhs.trim().to_string(),
            })),
            _ => Err(TransformError::Malformed {
                kind: "conditional",
                key: key.to_string(),
            }),
        }
    }

    pub fn is_match(&self, vars: &Vars, renderer: &dyn Renderer) -> Result<bool, RenderError> {
        Ok(match self {
            Condition::Default => false,
            Condition::Match { lhs, rhs } => operand(lhs, vars, renderer)? == literal(rhs, vars, renderer)?,
            Condition::Defined(token) => !operand(token, vars, renderer)?.is_empty(),
        })
    }
}

/// Left-hand side: rendered when templated, else a variable or the token itself.
fn operand(token: &str, vars: &Vars, renderer: &dyn Renderer) -> Result<String, RenderError> {
    if renderer.has_marker(token) {
        return renderer.render(token, vars);
    }
    Ok(match vars.get(token) {
        Some(value) => to_text(value),
        None => token.to_string(),
    })
}

fn literal(token: &str, vars: &Vars, renderer: &dyn Renderer) -> Result<String, RenderError> {
    if renderer.has_marker(token) {
        renderer.render(token, vars)
    } else {
        Ok(token.to_string())
    }
}

struct Pending {
    condition: Condition,
    is_match: bool,
    body: Map<String, Value>,
}

/// Claims `?` keys ahead of the template rule so their operands are rendered
/// with the knowledge of which ones were templated.
pub struct ConditionalRule {
    renderer: Arc<dyn Renderer>,
}

impl Default for ConditionalRule {
    fn default() -> Self {
        Self::new(Arc::new(MustacheRenderer))
    }
}

impl ConditionalRule {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

impl Rule for ConditionalRule {
    fn name(&self) -> &'static str {
        "conditional"
    }

    fn edit_property(&self, key: &str, value: &Value, cx: &Context, engine: &Engine) -> PropertyOutcome {
        let condition = match Condition::parse(key) {
            Ok(Some(condition)) => condition,
            Ok(None) => return PropertyOutcome::Inapplicable,
            Err(e) => {
                return match engine.policy().on_invalid_property_name {
                    Policy::Error => PropertyOutcome::Error(e),
                    Policy::Ignore => PropertyOutcome::Inapplicable,
                }
            }
        };
        let Value::Object(body) = value else {
            let message = format!("conditional '{key}' must hold an object, got {}", describe(value));
            return match engine.policy().invalid_value(message) {
                Ok(()) => PropertyOutcome::Ignore,
                Err(e) => PropertyOutcome::Error(e),
            };
        };
        let is_match = match condition.is_match(cx.vars(), self.renderer.as_ref()) {
            Ok(is_match) => is_match,
            // Left for the template rule, which keeps the key as written.
            Err(RenderError::Undefined(_)) if engine.policy().on_undefined_property_value == Policy::Ignore => {
                return PropertyOutcome::Inapplicable
            }
            Err(e) => return PropertyOutcome::Error(e.into()),
        };
        PropertyOutcome::Deferred(Deferred::new(
            self.name(),
            Pending {
                condition,
                is_match,
                body: body.clone(),
            },
        ))
    }

    fn finalize_properties(&self, deferred: &[Deferred], _cx: &Context, _engine: &Engine) -> FinalizeOutcome {
        let mut pending = deferred
            .iter()
            .filter_map(|d| d.downcast_ref::<Pending>())
            .peekable();
        if pending.peek().is_none() {
            return FinalizeOutcome::Inapplicable;
        }

        // A `?default` closes the chain of conditions before it: it is taken
        // only when none of them matched, and the next chain starts clean.
        let mut have_match = false;
        let mut selected = Vec::new();
        for p in pending {
            match p.condition {
                Condition::Default => {
                    if !have_match {
                        selected.push(p.body.clone());
                    }
                    have_match = false;
                }
                _ => {
                    if p.is_match {
                        selected.push(p.body.clone());
                    }
                    have_match |= p.is_match;
                }
            }
        }
        debug!(selected = selected.len(), "conditionals resolved");
        FinalizeOutcome::Success(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn vars(v: Value) -> Vars {
        Vars::try_from(v).unwrap()
    }

    #[test]
    fn parses_every_form() {
        assert_eq!(Condition::parse("plain").unwrap(), None);
        assert_eq!(Condition::parse("?default").unwrap(), Some(Condition::Default));
        assert_eq!(
            Condition::parse("?default # fallback").unwrap(),
            Some(Condition::Default)
        );
        assert_eq!(
            Condition::parse("? env = prod #note=x").unwrap(),
            Some(Condition::Match {
                lhs: "env".into(),
                rhs: "prod".into()
            })
        );
        assert_eq!(
            Condition::parse("?region").unwrap(),
            Some(Condition::Defined("region".into()))
        );
        assert_eq!(Condition::parse("?").unwrap(), Some(Condition::Defined(String::new())));
    }

    #[test]
    fn two_equals_signs_are_malformed() {
        let err = Condition::parse("?a=b=c").unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    fn holds(key: &str, v: &Vars) -> bool {
        Condition::parse(key)
            .unwrap()
            .unwrap()
            .is_match(v, &MustacheRenderer)
            .unwrap()
    }

    #[test]
    fn operands_resolve_through_variables() {
        let v = vars(json!({"x": "z", "n": 3, "empty": ""}));
        assert!(!holds("?x=x", &v));
        assert!(holds("?x=z", &v));
        assert!(holds("?n=3", &v));
        assert!(!holds("?empty", &v));
        assert!(holds("?literal", &v));
        assert!(!holds("?", &v));
        assert!(!Condition::Default.is_match(&v, &MustacheRenderer).unwrap());
    }

    #[test]
    fn rendered_operands_compare_as_written() {
        let v = vars(json!({"env": "prod", "prod": "yes", "blank": ""}));
        assert!(holds("?{{env}}=prod", &v));
        assert!(!holds("?prod=prod", &v));
        assert!(holds("?{{env}}={{env}}", &v));
        assert!(holds("?{{env}}", &v));
        assert!(!holds("?{{blank}}", &v));
    }

    #[test]
    fn undefined_operand_is_a_render_error() {
        let err = Condition::parse("?{{nope}}=a")
            .unwrap()
            .unwrap()
            .is_match(&vars(json!({})), &MustacheRenderer)
            .unwrap_err();
        assert_eq!(err, RenderError::Undefined("nope".into()));
    }
}
