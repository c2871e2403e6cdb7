//! Rule-driven rewriting of JSON documents.
//!
//! An [`Engine`] clones a document, offering every property and value to an
//! ordered [`RuleSet`] on the way down: templates are rendered, conditional
//! fragments included or dropped, multi-value keys expanded and catalog
//! references spliced in. Whatever no rule claims is merged structurally.

pub mod catalog;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod loader;
pub mod merge;
pub mod path;
pub mod render;
pub mod rules;
pub mod value;
mod parser;

use serde_json::Value;

pub use catalog::{Catalog, CompositeCatalog, PrefixCatalog, PrefixMode, TableCatalog};
pub use config::{EngineOptions, Policy, ValidationPolicy};
pub use context::{Context, ContextOverrides, ExtendFn, Vars};
pub use engine::Engine;
pub use errors::{CatalogError, LoadError, RenderError, Result, TransformError};
pub use render::{MustacheRenderer, Renderer};
pub use rules::{
    ConditionalRule, Deferred, FinalizeOutcome, MultiValueRule, PropertyOutcome, ReferenceRule, Rule,
    RuleSet, TemplateRule, ValueOutcome,
};

/// Convenience: transform `value` with the standard rules under `context`.
pub fn transform(value: &Value, context: Context) -> Result<Value> {
    Engine::standard(context).clone_value(value, None)
}

/// Convenience: merge `sources`, in order, into a fresh object with the
/// standard rules.
pub fn merge_documents(sources: &[Value], context: Context) -> Result<Value> {
    Engine::standard(context).merge_new(sources, None)
}
