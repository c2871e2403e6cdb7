use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::TransformError;

/// What to do when a defect of a given category is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    #[default]
    Error,
    Ignore,
}

/// Per-category handling of document defects.
///
/// * `on_invalid_property_name` covers empty rendered keys and malformed
///   conditional or multi-value keys.
/// * `on_invalid_property_value` covers values of the wrong shape for the rule
///   that claimed them, such as a conditional whose body is not an object.
/// * `on_undefined_property_value` covers templates naming an unbound variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub on_invalid_property_name: Policy,
    pub on_invalid_property_value: Policy,
    pub on_undefined_property_value: Policy,
}

impl ValidationPolicy {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self {
            on_invalid_property_name: Policy::Ignore,
            on_invalid_property_value: Policy::Ignore,
            on_undefined_property_value: Policy::Ignore,
        }
    }

    /// `Err(error)` under [`Policy::Error`], `Ok(())` when the defect is tolerated.
    pub fn invalid_value(&self, message: String) -> Result<(), TransformError> {
        match self.on_invalid_property_value {
            Policy::Error => Err(TransformError::InvalidPropertyValue(message)),
            Policy::Ignore => Ok(()),
        }
    }
}

pub const DEFAULT_MAX_EDIT_ROUNDS: usize = 32;
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub policy: ValidationPolicy,
    /// Upper bound on chained value edits before the engine gives up.
    pub max_edit_rounds: usize,
    /// Deepest nesting of containers and rewritten fragments, which also
    /// stops catalog entries that refer back to themselves.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            max_edit_rounds: DEFAULT_MAX_EDIT_ROUNDS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineOptions {
    pub fn with_policy(policy: ValidationPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}
