//! Recursive clone/merge driver.
//!
//! Every object is processed in two passes. The scan offers each property to
//! the rules in priority order, merging their fragments straight away and
//! parking deferred payloads in an accumulator owned by that object. The
//! finalize pass then hands the accumulator to the rules. Nested objects get
//! their own accumulator, so deferred state never leaks between levels.

use std::borrow::Cow;

use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{EngineOptions, ValidationPolicy};
use crate::context::{Context, ContextOverrides};
use crate::errors::{Result, TransformError};
use crate::merge::{self, MergeType};
use crate::rules::{Deferred, FinalizeOutcome, PropertyOutcome, RuleSet, ValueOutcome};
use crate::value::describe;

pub struct Engine {
    rules: RuleSet,
    defaults: Context,
    options: EngineOptions,
}

impl Engine {
    pub fn new(rules: RuleSet, defaults: Context, options: EngineOptions) -> Self {
        Self {
            rules,
            defaults,
            options,
        }
    }

    /// The standard rule set with default options.
    pub fn standard(defaults: Context) -> Self {
        Self::new(RuleSet::standard(), defaults, EngineOptions::default())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.options.policy
    }

    /// The construction-time context with `runtime` laid over it.
    pub fn context(&self, runtime: Option<&ContextOverrides>) -> Context {
        match runtime {
            Some(overrides) => self.defaults.overlaid(overrides),
            None => self.defaults.clone(),
        }
    }

    /// Transform `value`, returning a fresh tree.
    pub fn clone_value(&self, value: &Value, runtime: Option<&ContextOverrides>) -> Result<Value> {
        let cx = self.context(runtime);
        self.clone_in(value, &cx)?.ok_or(TransformError::IgnoredRoot)
    }

    /// Clone-and-merge each source object into `target`, in order.
    ///
    /// `target` is left partially merged when an error is returned.
    pub fn merge_into(
        &self,
        target: &mut Map<String, Value>,
        sources: &[Value],
        runtime: Option<&ContextOverrides>,
    ) -> Result<()> {
        let cx = self.context(runtime);
        for (idx, source) in sources.iter().enumerate() {
            let Some(edited) = self.edit_value(source, &cx)? else {
                continue;
            };
            match &*edited {
                Value::Object(fields) => self.merge_object_into(target, fields, &cx)?,
                other => {
                    return Err(TransformError::InvalidPropertyValue(format!(
                        "merge source {idx} is {}, expected an object",
                        describe(other)
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn merge_new(&self, sources: &[Value], runtime: Option<&ContextOverrides>) -> Result<Value> {
        let mut target = Map::new();
        self.merge_into(&mut target, sources, runtime)?;
        Ok(Value::Object(target))
    }

    /// Transform `value` under an explicit context. `Ok(None)` means a rule
    /// asked for the value to be dropped.
    pub fn clone_in(&self, value: &Value, cx: &Context) -> Result<Option<Value>> {
        match self.edit_value(value, cx)? {
            Some(edited) => self.clone_edited(&edited, cx).map(Some),
            None => Ok(None),
        }
    }

    /// Merge the properties of `source` into `target`, applying rules to each.
    pub fn merge_object_into(
        &self,
        target: &mut Map<String, Value>,
        source: &Map<String, Value>,
        cx: &Context,
    ) -> Result<()> {
        let mut deferred = Vec::new();
        self.scan(target, source, cx, &mut deferred)?;
        self.finalize(target, &deferred, cx)
    }

    /// Offer `value` to the value hooks until no rule claims it any more.
    fn edit_value<'v>(&self, value: &'v Value, cx: &Context) -> Result<Option<Cow<'v, Value>>> {
        let mut current = Cow::Borrowed(value);
        for round in 0..self.options.max_edit_rounds {
            let mut edited = None;
            for rule in self.rules.iter() {
                match rule.edit_value(&current, cx, self) {
                    ValueOutcome::Inapplicable => continue,
                    ValueOutcome::Success(next) => {
                        trace!(rule = rule.name(), round, "value edited");
                        edited = Some(next);
                        break;
                    }
                    ValueOutcome::Ignore => {
                        trace!(rule = rule.name(), "value ignored");
                        return Ok(None);
                    }
                    ValueOutcome::Error(e) => return Err(e),
                }
            }
            match edited {
                Some(next) => current = Cow::Owned(next),
                None => return Ok(Some(current)),
            }
        }
        Err(TransformError::Unsettled(self.options.max_edit_rounds))
    }

    /// The scope one level further down, or `TooDeep` past `max_depth`.
    fn nested(&self, cx: &Context) -> Result<Context> {
        let inner = cx.descend();
        if inner.depth() > self.options.max_depth {
            return Err(TransformError::TooDeep(self.options.max_depth));
        }
        Ok(inner)
    }

    /// Structural copy of a value that no value hook claims.
    fn clone_edited(&self, value: &Value, cx: &Context) -> Result<Value> {
        match value {
            Value::Object(fields) => {
                let mut out = Map::new();
                self.merge_object_into(&mut out, fields, &self.nested(cx)?)?;
                Ok(Value::Object(out))
            }
            Value::Array(items) => self.clone_elements(items, &self.nested(cx)?).map(Value::Array),
            primitive => Ok(primitive.clone()),
        }
    }

    fn clone_elements(&self, items: &[Value], cx: &Context) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if let Some(cloned) = self.clone_in(item, cx).map_err(|e| e.at(format!("[{idx}]")))? {
                out.push(cloned);
            }
        }
        Ok(out)
    }

    fn scan(
        &self,
        target: &mut Map<String, Value>,
        source: &Map<String, Value>,
        cx: &Context,
        deferred: &mut Vec<Deferred>,
    ) -> Result<()> {
        for (key, value) in source {
            self.scan_property(target, key, value, cx, deferred)
                .map_err(|e| e.at(key.as_str()))?;
        }
        Ok(())
    }

    fn scan_property(
        &self,
        target: &mut Map<String, Value>,
        key: &str,
        value: &Value,
        cx: &Context,
        deferred: &mut Vec<Deferred>,
    ) -> Result<()> {
        for rule in self.rules.iter() {
            match rule.edit_property(key, value, cx, self) {
                PropertyOutcome::Inapplicable => continue,
                PropertyOutcome::Success(fragment) => {
                    trace!(rule = rule.name(), key, "property rewritten");
                    // Fragment properties belong to this object level, so they
                    // share its deferred accumulator.
                    return self.scan(target, &fragment, &self.nested(cx)?, deferred);
                }
                PropertyOutcome::Deferred(payload) => {
                    trace!(rule = rule.name(), key, "property deferred");
                    deferred.push(payload);
                    return Ok(());
                }
                PropertyOutcome::Ignore => {
                    trace!(rule = rule.name(), key, "property ignored");
                    return Ok(());
                }
                PropertyOutcome::Error(e) => return Err(e),
            }
        }

        match self.edit_value(value, cx)? {
            Some(edited) => self.merge_value(target, key, &edited, cx),
            None => Ok(()),
        }
    }

    fn merge_value(&self, target: &mut Map<String, Value>, key: &str, source: &Value, cx: &Context) -> Result<()> {
        match merge::resolve(target.get(key), Some(source)) {
            MergeType::None => {}
            MergeType::Clobber => {
                let cloned = self.clone_edited(source, cx)?;
                target.insert(key.to_string(), cloned);
            }
            MergeType::Array => {
                if let (Some(Value::Array(existing)), Value::Array(items)) = (target.get_mut(key), source) {
                    let cloned = self.clone_elements(items, &self.nested(cx)?)?;
                    existing.extend(cloned);
                }
            }
            MergeType::Object => {
                if let (Some(Value::Object(existing)), Value::Object(fields)) = (target.get_mut(key), source) {
                    self.merge_object_into(existing, fields, &self.nested(cx)?)?;
                }
            }
        }
        Ok(())
    }

    fn finalize(&self, target: &mut Map<String, Value>, deferred: &[Deferred], cx: &Context) -> Result<()> {
        for rule in self.rules.iter() {
            match rule.finalize_properties(deferred, cx, self) {
                FinalizeOutcome::Inapplicable => continue,
                FinalizeOutcome::Success(objects) => {
                    debug!(rule = rule.name(), objects = objects.len(), "merging finalized properties");
                    for object in &objects {
                        self.merge_object_into(target, object, cx)?;
                    }
                    return Ok(());
                }
                FinalizeOutcome::Ignore => return Ok(()),
                FinalizeOutcome::Error(e) => return Err(e),
            }
        }
        if !deferred.is_empty() {
            debug!(
                count = deferred.len(),
                rules = %deferred.iter().map(Deferred::rule).unique().join(","),
                "deferred properties left unclaimed"
            );
        }
        Ok(())
    }
}
