use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::context::Context;
use crate::engine::Engine;
use crate::errors::TransformError;

mod conditional;
mod multi_value;
mod reference;
mod template;

pub use conditional::{Condition, ConditionalRule};
pub use multi_value::MultiValueRule;
pub use reference::ReferenceRule;
pub use template::TemplateRule;

/// Result of offering one property to a rule.
#[derive(Debug)]
pub enum PropertyOutcome {
    /// Merge these properties in place of the original one.
    Success(Map<String, Value>),
    /// Hold the payload until the end of the current object's scan.
    Deferred(Deferred),
    /// Drop the property.
    Ignore,
    Inapplicable,
    Error(TransformError),
}

/// Result of offering a whole value to a rule.
#[derive(Debug)]
pub enum ValueOutcome {
    Success(Value),
    Ignore,
    Inapplicable,
    Error(TransformError),
}

/// Result of handing the deferred payloads of one object to a rule.
#[derive(Debug)]
pub enum FinalizeOutcome {
    /// Objects to merge into the target, in order.
    Success(Vec<Map<String, Value>>),
    Ignore,
    Inapplicable,
    Error(TransformError),
}

/// Opaque payload parked by a rule during the property scan.
pub struct Deferred {
    rule: &'static str,
    payload: Box<dyn Any + Send + Sync>,
}

impl Deferred {
    pub fn new<T: Any + Send + Sync>(rule: &'static str, payload: T) -> Self {
        Self {
            rule,
            payload: Box::new(payload),
        }
    }

    /// Name of the rule that deferred this payload.
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").field("rule", &self.rule).finish_non_exhaustive()
    }
}

/// A rewriting rule. Every hook defaults to [`Inapplicable`](PropertyOutcome::Inapplicable),
/// so a rule implements only the ones it cares about.
///
/// Rules get the engine back so they can clone sub-documents under a derived
/// context; they must not keep any per-document state of their own.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn edit_property(
        &self,
        _key: &str,
        _value: &Value,
        _cx: &Context,
        _engine: &Engine,
    ) -> PropertyOutcome {
        PropertyOutcome::Inapplicable
    }

    fn edit_value(&self, _value: &Value, _cx: &Context, _engine: &Engine) -> ValueOutcome {
        ValueOutcome::Inapplicable
    }

    fn finalize_properties(
        &self,
        _deferred: &[Deferred],
        _cx: &Context,
        _engine: &Engine,
    ) -> FinalizeOutcome {
        FinalizeOutcome::Inapplicable
    }
}

/// Ordered rule list; earlier rules get the first offer.
#[derive(Clone, Default)]
pub struct RuleSet {
    inner: Arc<Vec<Arc<dyn Rule>>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conditional, template, multi-value and reference rules, in that order.
    pub fn standard() -> Self {
        let rules: Vec<Arc<dyn Rule>> = vec![
            Arc::new(ConditionalRule::default()),
            Arc::new(TemplateRule::default()),
            Arc::new(MultiValueRule),
            Arc::new(ReferenceRule),
        ];
        Self {
            inner: Arc::new(rules),
        }
    }

    /// Append a rule with the lowest priority so far.
    pub fn push<R: Rule + 'static>(&mut self, rule: R) {
        Arc::make_mut(&mut self.inner).push(Arc::new(rule));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.inner.iter().map(|r| r.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Noop;
    impl Rule for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }
    }

    #[test]
    fn standard_order() {
        assert_eq!(
            RuleSet::standard().names(),
            vec!["conditional", "template", "multi-value", "reference"]
        );
    }

    #[test]
    fn push_appends_without_touching_clones() {
        let base = RuleSet::standard();
        let mut extended = base.clone();
        extended.push(Noop);
        assert_eq!(base.len(), 4);
        assert_eq!(extended.len(), 5);
        assert_eq!(extended.names().last(), Some(&"noop"));
    }

    #[test]
    fn deferred_payload_downcasts_to_its_own_type() {
        let d = Deferred::new("noop", 7u32);
        assert_eq!(d.rule(), "noop");
        assert_eq!(d.downcast_ref::<u32>(), Some(&7));
        assert_eq!(d.downcast_ref::<String>(), None);
    }
}
