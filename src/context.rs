//! Variable scope and reference catalog threaded through a transform.
//!
//! A [`Context`] is never mutated once built. Nested scopes (one per
//! multi-value item, one per reference lookup with explicit variables) are
//! produced by [`Context::extend`], which layers new bindings over the parent
//! scope without copying it.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::errors::TransformError;
use crate::value::describe;

/// Layered variable bindings: local names shadow the parent, unset names fall
/// through to it.
#[derive(Clone, Default)]
pub struct Vars {
    layer: Arc<Layer>,
}

#[derive(Default)]
struct Layer {
    local: Map<String, Value>,
    parent: Option<Vars>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut current = self;
        loop {
            if let Some(v) = current.layer.local.get(name) {
                return Some(v);
            }
            current = current.layer.parent.as_ref()?;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// A new scope with `additions` layered over `self`.
    pub fn overlay(&self, additions: Map<String, Value>) -> Vars {
        if additions.is_empty() {
            return self.clone();
        }
        Vars {
            layer: Arc::new(Layer {
                local: additions,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Every visible binding, outermost scope first.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut out = match &self.layer.parent {
            Some(parent) => parent.to_map(),
            None => Map::new(),
        };
        for (k, v) in &self.layer.local {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}

impl From<Map<String, Value>> for Vars {
    fn from(local: Map<String, Value>) -> Self {
        Vars {
            layer: Arc::new(Layer {
                local,
                parent: None,
            }),
        }
    }
}

impl TryFrom<Value> for Vars {
    type Error = TransformError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Vars::from(map)),
            other => Err(TransformError::InvalidPropertyValue(format!(
                "variables must be an object, got {}",
                describe(&other)
            ))),
        }
    }
}

impl fmt::Debug for Vars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.to_map()).finish()
    }
}

/// Builds the variables of an extended scope from the parent's variables and
/// the new bindings.
pub type ExtendFn = Arc<dyn Fn(&Vars, Map<String, Value>) -> Vars + Send + Sync>;

pub fn overlay_extend() -> ExtendFn {
    Arc::new(|base: &Vars, additions: Map<String, Value>| base.overlay(additions))
}

#[derive(Clone)]
pub struct Context {
    vars: Vars,
    refs: Option<Arc<dyn Catalog>>,
    extend: ExtendFn,
    depth: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Vars::default())
    }
}

impl Context {
    pub fn new(vars: impl Into<Vars>) -> Self {
        Self {
            vars: vars.into(),
            refs: None,
            extend: overlay_extend(),
            depth: 0,
        }
    }

    pub fn with_refs(mut self, refs: Arc<dyn Catalog>) -> Self {
        self.refs = Some(refs);
        self
    }

    pub fn with_extend(mut self, extend: ExtendFn) -> Self {
        self.extend = extend;
        self
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn refs(&self) -> Option<&dyn Catalog> {
        self.refs.as_deref()
    }

    /// How many containers and rewritten fragments enclose this scope.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn descend(&self) -> Context {
        Context {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// Derived context with `additions` bound on top of the current variables.
    pub fn extend(&self, additions: Map<String, Value>) -> Context {
        Context {
            vars: (self.extend)(&self.vars, additions),
            refs: self.refs.clone(),
            extend: Arc::clone(&self.extend),
            depth: self.depth,
        }
    }

    pub fn bind(&self, name: impl Into<String>, value: Value) -> Context {
        let mut additions = Map::new();
        additions.insert(name.into(), value);
        self.extend(additions)
    }

    /// Apply per-call overrides; each aspect left unset keeps this context's.
    pub fn overlaid(&self, overrides: &ContextOverrides) -> Context {
        Context {
            vars: overrides.vars.clone().unwrap_or_else(|| self.vars.clone()),
            refs: overrides.refs.clone().or_else(|| self.refs.clone()),
            extend: overrides
                .extend
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.extend)),
            depth: self.depth,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("vars", &self.vars)
            .field("refs", &self.refs.is_some())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Runtime context supplied to a single engine call.
#[derive(Clone, Default)]
pub struct ContextOverrides {
    pub vars: Option<Vars>,
    pub refs: Option<Arc<dyn Catalog>>,
    pub extend: Option<ExtendFn>,
}

impl ContextOverrides {
    pub fn vars(vars: impl Into<Vars>) -> Self {
        Self {
            vars: Some(vars.into()),
            ..Self::default()
        }
    }

    pub fn with_refs(mut self, refs: Arc<dyn Catalog>) -> Self {
        self.refs = Some(refs);
        self
    }

    pub fn with_extend(mut self, extend: ExtendFn) -> Self {
        self.extend = Some(extend);
        self
    }
}
