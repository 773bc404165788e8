//! Loading catalog entities from JSON or YAML files.
//!
//! Used to seed or refresh the catalog database from an exported entity
//! list. The file holds a single sequence of `CatalogEntity` records.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::types::CatalogEntity;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yml::Error,
    },
    #[error("Unsupported file extension for {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
    #[error("Duplicate entity id '{id}' in {path}")]
    DuplicateId { path: String, id: String },
    #[error("Entity at position {index} in {path} has an empty id or name")]
    MissingField { path: String, index: usize },
}

/// Load entities from a `.json`, `.yaml` or `.yml` file.
///
/// Rejects duplicate ids and records with a blank id or name so a bad export
/// never reaches the database half-applied.
pub fn load_entities(path: &Path) -> Result<Vec<CatalogEntity>, ImportError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| ImportError::Io {
        path: display.clone(),
        source: e,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let entities: Vec<CatalogEntity> = match ext.as_str() {
        "json" => serde_json::from_str(&content).map_err(|e| ImportError::Json {
            path: display.clone(),
            source: e,
        })?,
        "yaml" | "yml" => serde_yml::from_str(&content).map_err(|e| ImportError::Yaml {
            path: display.clone(),
            source: e,
        })?,
        _ => return Err(ImportError::UnsupportedFormat(display)),
    };

    let mut seen = HashSet::new();
    for (index, entity) in entities.iter().enumerate() {
        if entity.id.trim().is_empty() || entity.name.trim().is_empty() {
            return Err(ImportError::MissingField {
                path: display,
                index,
            });
        }
        if !seen.insert(entity.id.as_str()) {
            return Err(ImportError::DuplicateId {
                path: display,
                id: entity.id.clone(),
            });
        }
    }

    Ok(entities)
}
