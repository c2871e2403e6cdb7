use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::{PropertyOutcome, Rule, ValueOutcome};
use crate::config::Policy;
use crate::context::Context;
use crate::engine::Engine;
use crate::errors::{RenderError, TransformError};
use crate::render::{MustacheRenderer, Renderer};

/// Renders substitution markers in string values and property names.
pub struct TemplateRule {
    renderer: Arc<dyn Renderer>,
}

impl Default for TemplateRule {
    fn default() -> Self {
        Self::new(Arc::new(MustacheRenderer))
    }
}

impl TemplateRule {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// `Ok(None)` when an undefined variable is tolerated and the text should
    /// stay as written.
    fn render(&self, text: &str, cx: &Context, engine: &Engine) -> Result<Option<String>, TransformError> {
        match self.renderer.render(text, cx.vars()) {
            Ok(rendered) => Ok(Some(rendered)),
            Err(RenderError::Undefined(name))
                if engine.policy().on_undefined_property_value == Policy::Ignore =>
            {
                debug!(variable = %name, text, "undefined variable left unrendered");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Rule for TemplateRule {
    fn name(&self) -> &'static str {
        "template"
    }

    fn edit_property(&self, key: &str, value: &Value, cx: &Context, engine: &Engine) -> PropertyOutcome {
        if !self.renderer.has_marker(key) {
            return PropertyOutcome::Inapplicable;
        }
        let rendered = match self.render(key, cx, engine) {
            Ok(Some(rendered)) => rendered,
            Ok(None) => return PropertyOutcome::Inapplicable,
            Err(e) => return PropertyOutcome::Error(e),
        };
        // A name that still carries a marker would be re-rendered forever.
        if rendered.is_empty() || self.renderer.has_marker(&rendered) {
            return match engine.policy().on_invalid_property_name {
                Policy::Error => PropertyOutcome::Error(TransformError::InvalidPropertyName(rendered)),
                Policy::Ignore => PropertyOutcome::Ignore,
            };
        }
        let mut fragment = Map::new();
        fragment.insert(rendered, value.clone());
        PropertyOutcome::Success(fragment)
    }

    fn edit_value(&self, value: &Value, cx: &Context, engine: &Engine) -> ValueOutcome {
        let Value::String(text) = value else {
            return ValueOutcome::Inapplicable;
        };
        if !self.renderer.has_marker(text) {
            return ValueOutcome::Inapplicable;
        }
        match self.render(text, cx, engine) {
            Ok(Some(rendered)) => ValueOutcome::Success(Value::String(rendered)),
            Ok(None) => ValueOutcome::Inapplicable,
            Err(e) => ValueOutcome::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineOptions, ValidationPolicy};
    use crate::context::Vars;
    use crate::rules::RuleSet;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine(policy: ValidationPolicy) -> Engine {
        let mut rules = RuleSet::new();
        rules.push(TemplateRule::default());
        Engine::new(rules, Context::default(), EngineOptions::with_policy(policy))
    }

    fn cx() -> Context {
        Context::new(Vars::try_from(json!({"env": "prod", "blank": ""})).unwrap())
    }

    #[test]
    fn renders_values_and_keys() {
        let rule = TemplateRule::default();
        let e = engine(ValidationPolicy::strict());
        match rule.edit_value(&json!("db-{{env}}"), &cx(), &e) {
            ValueOutcome::Success(v) => assert_eq!(v, json!("db-prod")),
            other => panic!("unexpected {other:?}"),
        }
        match rule.edit_property("{{env}}_url", &json!(1), &cx(), &e) {
            PropertyOutcome::Success(m) => assert_eq!(Value::Object(m), json!({"prod_url": 1})),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn plain_strings_and_non_strings_are_inapplicable() {
        let rule = TemplateRule::default();
        let e = engine(ValidationPolicy::strict());
        assert!(matches!(rule.edit_value(&json!("plain"), &cx(), &e), ValueOutcome::Inapplicable));
        assert!(matches!(rule.edit_value(&json!(3), &cx(), &e), ValueOutcome::Inapplicable));
        assert!(matches!(
            rule.edit_property("plain", &json!(3), &cx(), &e),
            PropertyOutcome::Inapplicable
        ));
    }

    #[test]
    fn empty_rendered_name_follows_policy() {
        let rule = TemplateRule::default();
        let strict = engine(ValidationPolicy::strict());
        match rule.edit_property("{{blank}}", &json!(1), &cx(), &strict) {
            PropertyOutcome::Error(e) => assert!(e.to_string().contains("invalid property name")),
            other => panic!("unexpected {other:?}"),
        }
        let lenient = engine(ValidationPolicy::lenient());
        assert!(matches!(
            rule.edit_property("{{blank}}", &json!(1), &cx(), &lenient),
            PropertyOutcome::Ignore
        ));
    }

    #[test]
    fn undefined_variables_follow_policy() {
        let rule = TemplateRule::default();
        let strict = engine(ValidationPolicy::strict());
        assert!(matches!(
            rule.edit_value(&json!("{{nope}}"), &cx(), &strict),
            ValueOutcome::Error(TransformError::Render(RenderError::Undefined(_)))
        ));
        let lenient = engine(ValidationPolicy::lenient());
        assert!(matches!(
            rule.edit_value(&json!("{{nope}}"), &cx(), &lenient),
            ValueOutcome::Inapplicable
        ));
        assert!(matches!(
            rule.edit_property("{{nope}}", &json!(1), &cx(), &lenient),
            PropertyOutcome::Inapplicable
        ));
    }

    #[test]
    fn syntax_errors_are_never_tolerated() {
        let rule = TemplateRule::default();
        let lenient = engine(ValidationPolicy::lenient());
        assert!(matches!(
            rule.edit_value(&json!("{{env"), &cx(), &lenient),
            ValueOutcome::Error(TransformError::Render(RenderError::Syntax(_)))
        ));
    }
}
