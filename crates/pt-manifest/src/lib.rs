//! pt-manifest: canonical module manifest format and validation.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_manifest};

pub type ManifestResult<T> = Result<T, ManifestError>;

/// Anything that can go wrong between a file on disk and a valid manifest.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads and validates a YAML manifest.
pub fn load_yaml(path: &std::path::Path) -> ManifestResult<ModuleManifest> {
    let content = std::fs::read_to_string(path)?;
    let manifest: ModuleManifest = serde_yaml::from_str(&content)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Validates and writes a manifest as YAML. Invalid manifests never reach
/// disk.
pub fn save_yaml(path: &std::path::Path, manifest: &ModuleManifest) -> ManifestResult<()> {
    validate_manifest(manifest)?;
    let content = serde_yaml::to_string(manifest)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Reads and validates a JSON manifest.
pub fn load_json(path: &std::path::Path) -> ManifestResult<ModuleManifest> {
    let content = std::fs::read_to_string(path)?;
    let manifest: ModuleManifest = serde_json::from_str(&content)?;
    validate_manifest(&manifest)?;
    Ok(manifest)
}

/// Validates and writes a manifest as pretty-printed JSON.
pub fn save_json(path: &std::path::Path, manifest: &ModuleManifest) -> ManifestResult<()> {
    validate_manifest(manifest)?;
    let content = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, content)?;
    Ok(())
}
