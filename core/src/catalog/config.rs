//! Catalog loading
//!
//! Trait definitions come from TOML files in two places:
//! - **Builtin**: shipped with the crate (embedded) or an install directory
//! - **Custom**: user definitions that override builtins by key

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use traitwatch_types::DefinitionConfig;

use super::TraitCatalog;
use crate::error::UnknownTraitError;

/// Builtin definitions embedded at compile time
pub const BUILTIN_TRAITS: &str = include_str!("../../definitions/traits.toml");

/// Errors that can occur while loading or validating the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("builtin catalog is malformed: {0}")]
    Builtin(toml::de::Error),
    #[error("invalid definition {key}: {reason}")]
    Invalid { key: String, reason: String },
    #[error("headline trait missing from catalog: {0}")]
    UnknownHeadline(#[from] UnknownTraitError),
}

/// Load the catalog.
///
/// Starts from the embedded builtin set, then layers `builtin_dir` (if it
/// exists) and finally `custom_dir`. Later layers override earlier ones by
/// key. Files that fail to parse are logged and skipped.
pub fn load_catalog(
    builtin_dir: Option<&Path>,
    custom_dir: Option<&Path>,
) -> Result<TraitCatalog, CatalogError> {
    let mut catalog = TraitCatalog::builtin()?;

    if let Some(dir) = builtin_dir
        && dir.exists()
    {
        load_directory(&mut catalog, dir, "builtin")?;
    }

    if let Some(dir) = custom_dir
        && dir.exists()
    {
        load_directory(&mut catalog, dir, "custom")?;
    }

    tracing::debug!(traits = catalog.len(), "Trait catalog loaded");
    Ok(catalog)
}

/// Load all TOML files from a directory, in file name order
fn load_directory(catalog: &mut TraitCatalog, dir: &Path, source: &str) -> Result<(), CatalogError> {
    let entries = fs::read_dir(dir).map_err(|e| CatalogError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path) {
            Ok(config) => {
                let duplicates = catalog.add_config(config);
                if !duplicates.is_empty() {
                    tracing::warn!(
                        source,
                        file = ?path.file_name(),
                        ?duplicates,
                        "Trait definitions overridden"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(source, error = %e, "Skipping trait definition file");
            }
        }
    }

    Ok(())
}

/// Load a single TOML definition file
pub fn load_file(path: &Path) -> Result<DefinitionConfig, CatalogError> {
    let contents = fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| CatalogError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Builtin definitions directory next to the executable
pub fn default_builtin_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("definitions")))
}

/// User definitions directory
pub fn default_custom_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("traitwatch").join("traits"))
}
