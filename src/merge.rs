//! Decides how a source value lands on an existing target slot.

use serde_json::Value;

use crate::value::{classify, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeType {
    /// Nothing to merge.
    None,
    /// Replace the target outright.
    Clobber,
    /// Append source elements to the target array.
    Array,
    /// Merge source properties into the target object.
    Object,
}

pub fn merge_type_of(value: Option<&Value>) -> MergeType {
    match value.map(classify) {
        None => MergeType::None,
        Some(ValueKind::Primitive) => MergeType::Clobber,
        Some(ValueKind::Array) => MergeType::Array,
        Some(ValueKind::Object) => MergeType::Object,
    }
}

/// Containers merge only into containers of the same kind; every other
/// combination clobbers.
pub fn resolve(target: Option<&Value>, source: Option<&Value>) -> MergeType {
    let source_type = merge_type_of(source);
    if source_type == MergeType::None {
        return MergeType::None;
    }
    if merge_type_of(target) == source_type {
        source_type
    } else {
        MergeType::Clobber
    }
}
