//! Read-only lookup tables of reusable JSON values.
//!
//! Catalogs separate "could this key ever live here" ([`Catalog::key_is_in_range`])
//! from "is it here right now" ([`Catalog::has`]) so that a [`CompositeCatalog`]
//! can route a key to the member responsible for it.

use std::sync::Arc;

use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::CatalogError;
use crate::render::contains_marker;

pub trait Catalog: Send + Sync {
    fn key_is_in_range(&self, key: &str) -> bool;
    fn has(&self, key: &str) -> bool;
    /// The stored value, or [`CatalogError::Unknown`] when the key is absent.
    fn get(&self, key: &str) -> Result<Value, CatalogError>;
}

/// Keys must be non-empty, free of substitution markers, and must not look
/// like a conditional (`?...`).
pub fn validate_key(key: &str) -> Result<(), CatalogError> {
    if key.is_empty() || contains_marker(key) || key.starts_with('?') {
        return Err(CatalogError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// A plain in-memory table.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    entries: Map<String, Value>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Result<Self, CatalogError> {
        let mut table = Self::new();
        for (key, value) in map {
            table.insert(key, value)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Result<(), CatalogError> {
        let key = key.into();
        validate_key(&key)?;
        if self.entries.contains_key(&key) {
            return Err(CatalogError::Duplicate(key));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog for TableCatalog {
    fn key_is_in_range(&self, key: &str) -> bool {
        validate_key(key).is_ok()
    }

    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<Value, CatalogError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| CatalogError::Unknown(key.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMode {
    /// Inner keys already carry the prefix; the wrapper only restricts the range.
    Require,
    /// Inner keys are bare; the wrapper exposes them under the prefix.
    Add,
}

/// Restricts a catalog to keys starting with `prefix`.
pub struct PrefixCatalog {
    prefix: String,
    mode: PrefixMode,
    inner: Arc<dyn Catalog>,
}

impl PrefixCatalog {
    pub fn new(prefix: impl Into<String>, mode: PrefixMode, inner: Arc<dyn Catalog>) -> Self {
        Self {
            prefix: prefix.into(),
            mode,
            inner,
        }
    }

    fn inner_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            return None;
        }
        Some(match self.mode {
            PrefixMode::Require => key,
            PrefixMode::Add => rest,
        })
    }
}

impl Catalog for PrefixCatalog {
    fn key_is_in_range(&self, key: &str) -> bool {
        self.inner_key(key)
            .is_some_and(|inner| self.inner.key_is_in_range(inner))
    }

    fn has(&self, key: &str) -> bool {
        self.inner_key(key).is_some_and(|inner| self.inner.has(inner))
    }

    fn get(&self, key: &str) -> Result<Value, CatalogError> {
        let inner = self
            .inner_key(key)
            .ok_or_else(|| CatalogError::Unknown(key.to_string()))?;
        self.inner.get(inner).map_err(|e| match e {
            CatalogError::Unknown(_) => CatalogError::Unknown(key.to_string()),
            other => other,
        })
    }
}

/// Ordered list of catalogs; earlier members take precedence.
#[derive(Default)]
pub struct CompositeCatalog {
    members: Vec<Arc<dyn Catalog>>,
}

impl CompositeCatalog {
    pub fn new(members: Vec<Arc<dyn Catalog>>) -> Self {
        Self { members }
    }

    /// Append a member with lower precedence than every existing one.
    pub fn push(&mut self, member: Arc<dyn Catalog>) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn in_range<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Arc<dyn Catalog>> + 'a {
        self.members.iter().filter(move |m| m.key_is_in_range(key))
    }
}

impl Catalog for CompositeCatalog {
    fn key_is_in_range(&self, key: &str) -> bool {
        self.in_range(key).next().is_some()
    }

    fn has(&self, key: &str) -> bool {
        self.in_range(key).any(|m| m.has(key))
    }

    fn get(&self, key: &str) -> Result<Value, CatalogError> {
        let mut tried = Vec::new();
        for (idx, member) in self.members.iter().enumerate() {
            if !member.key_is_in_range(key) {
                continue;
            }
            match member.get(key) {
                Err(CatalogError::Unknown(_)) => tried.push(idx),
                result => return result,
            }
        }
        debug!(key, members = %tried.iter().join(","), "reference not found in any catalog");
        Err(CatalogError::Unknown(key.to_string()))
    }
}
