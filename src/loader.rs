//! Reading documents and catalogs from disk, and writing results back.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::TableCatalog;
use crate::context::Vars;
use crate::errors::LoadError;

pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_vars(path: &Path) -> Result<Vars, LoadError> {
    match load_document(path)? {
        Value::Object(map) => Ok(Vars::from(map)),
        _ => Err(LoadError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// One entry per `*.json` file in `dir`, keyed by file stem, in name order.
/// Subdirectories and other files are skipped.
pub fn load_catalog_dir(dir: &Path) -> Result<TableCatalog, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut table = TableCatalog::new();
    for path in files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            debug!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };
        let value = load_document(&path)?;
        table
            .insert(stem, value)
            .map_err(|source| LoadError::Catalog {
                path: path.clone(),
                source,
            })?;
    }
    info!(dir = %dir.display(), entries = table.len(), "loaded catalog");
    Ok(table)
}

/// Two-space indented JSON with a trailing newline.
pub fn to_pretty(value: &Value) -> String {
    let mut out = format!("{value:#}");
    out.push('\n');
    out
}

pub fn write_document(path: &Path, value: &Value) -> Result<(), LoadError> {
    fs::write(path, to_pretty(value)).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
