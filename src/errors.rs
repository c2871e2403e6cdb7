use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a template renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("undefined variable '{0}'")]
    Undefined(String),
}

/// Failure reported by a reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown reference '{0}'")]
    Unknown(String),

    #[error("invalid reference key '{0}'")]
    InvalidKey(String),

    #[error("duplicate reference key '{0}'")]
    Duplicate(String),
}

/// Every way a transform can fail.
///
/// Errors raised below an object property or array element are wrapped in
/// [`TransformError::At`] on the way up, so the rendered message reads as a
/// path: `outer: inner: [2]: undefined variable 'x'`.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{key}: {source}")]
    At {
        key: String,
        #[source]
        source: Box<TransformError>,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("malformed {kind} key '{key}'")]
    Malformed { kind: &'static str, key: String },

    #[error("invalid property name '{0}'")]
    InvalidPropertyName(String),

    #[error("invalid property value: {0}")]
    InvalidPropertyValue(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("path '{path}' not found in reference '{reference}'")]
    MissingPath { path: String, reference: String },

    #[error("top-level value was ignored")]
    IgnoredRoot,

    #[error("value edits did not settle after {0} rounds")]
    Unsettled(usize),

    #[error("nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("{0}")]
    Rule(String),
}

impl TransformError {
    /// Prefix this error with the key (or `[index]`) it was raised under.
    pub fn at(self, key: impl Into<String>) -> Self {
        TransformError::At {
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with every key prefix stripped.
    pub fn root(&self) -> &TransformError {
        match self {
            TransformError::At { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Failure while reading documents, variables or catalogs from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: expected a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("{path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

// Type alias for results that use `TransformError` as the error type
pub type Result<T> = std::result::Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_prefixes_read_as_a_path() {
        let err = TransformError::Render(RenderError::Undefined("x".into()))
            .at("[2]")
            .at("items");
        assert_eq!(err.to_string(), "items: [2]: undefined variable 'x'");
        assert!(matches!(
            err.root(),
            TransformError::Render(RenderError::Undefined(_))
        ));
    }

    #[test]
    fn malformed_message_names_the_key() {
        let err = TransformError::Malformed {
            kind: "conditional",
            key: "?a=b=c".into(),
        };
        assert_eq!(err.to_string(), "malformed conditional key '?a=b=c'");
    }
}
