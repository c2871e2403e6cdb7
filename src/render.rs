//! String templating used by the template and conditional rules.
//!
//! The engine only needs two things from a renderer: whether a string carries
//! a substitution marker at all, and the rendered text. [`MustacheRenderer`] is
//! the stock implementation; anything implementing [`Renderer`] can replace it.

use serde_json::Value;

use crate::context::Vars;
use crate::errors::RenderError;
use crate::parser::Parser;
use crate::path::Path;
use crate::value::to_text;

pub const MARKER_OPEN: &str = "{{";
pub const MARKER_CLOSE: &str = "}}";

/// True when `s` contains the opening substitution marker.
pub fn contains_marker(s: &str) -> bool {
    s.contains(MARKER_OPEN)
}

pub trait Renderer: Send + Sync {
    fn has_marker(&self, s: &str) -> bool;
    fn render(&self, template: &str, vars: &Vars) -> Result<String, RenderError>;
}

/// `{{ name }}` substitution, where `name` may continue into object and array
/// variables with a dot path (`{{ service.ports[0] }}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MustacheRenderer;

impl Renderer for MustacheRenderer {
    fn has_marker(&self, s: &str) -> bool {
        contains_marker(s)
    }

    fn render(&self, template: &str, vars: &Vars) -> Result<String, RenderError> {
        let mut p = Parser::new(template);
        let mut out = String::with_capacity(template.len());
        loop {
            out.push_str(p.take_until_str(MARKER_OPEN));
            if !p.consume_str(MARKER_OPEN) {
                break;
            }
            let name = p.capture_until_str(MARKER_CLOSE).map_err(|_| {
                RenderError::Syntax(format!("unterminated marker in '{template}'"))
            })?;
            p.consume_str(MARKER_CLOSE);
            let value = lookup(name.trim(), vars)?;
            out.push_str(&to_text(value));
        }
        Ok(out)
    }
}

fn lookup<'v>(name: &str, vars: &'v Vars) -> Result<&'v Value, RenderError> {
    if name.is_empty() {
        return Err(RenderError::Syntax("empty marker".into()));
    }
    let mut p = Parser::new(name);
    let head = p.take_until_any(&['.', '[']);
    let root = vars
        .get(head)
        .ok_or_else(|| RenderError::Undefined(head.to_string()))?;
    let rest = &name[p.position()..];
    if rest.is_empty() {
        return Ok(root);
    }
    let path = Path::parse(rest.strip_prefix('.').unwrap_or(rest))
        .map_err(|e| RenderError::Syntax(format!("'{name}': {e}")))?;
    path.pick(root)
        .ok_or_else(|| RenderError::Undefined(name.to_string()))
}
