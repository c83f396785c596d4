//! JSON model files
//!
//! A model file is a pretty-printed JSON envelope:
//!
//! ```json
//! { "format": "raksor-model", "format_version": "1.0.0", "model": { ... } }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use super::versioning::{ModelVersion, FORMAT_MAGIC};
use crate::error::{RaksorError, Result};
use crate::model::RankingModel;

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    format: &'a str,
    format_version: String,
    model: &'a RankingModel,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    format: Option<String>,
    format_version: Option<String>,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    model: RankingModel,
}

/// Save a model to `path`, creating parent directories
pub fn save_model(model: &RankingModel, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let envelope = EnvelopeOut {
        format: FORMAT_MAGIC,
        format_version: ModelVersion::CURRENT.to_string(),
        model,
    };

    let file = File::create(path).map_err(|e| {
        RaksorError::DataError(format!("Failed to create {}: {}", path.display(), e))
    })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &envelope).map_err(|e| {
        RaksorError::SerializationError(format!("Failed to write {}: {}", path.display(), e))
    })?;

    tracing::info!(path = %path.display(), version = %ModelVersion::CURRENT, "Saved model");
    Ok(())
}

/// Load a model from `path`.
///
/// Unreadable files are `ModelNotFound`; anything that is not a readable
/// model envelope of a supported version is `ModelIncompatible`.
pub fn load_model(path: impl AsRef<Path>) -> Result<RankingModel> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let content = fs::read_to_string(path).map_err(|e| RaksorError::ModelNotFound {
        path: shown.clone(),
        reason: e.to_string(),
    })?;

    let incompatible = |reason: String| RaksorError::ModelIncompatible {
        path: shown.clone(),
        reason,
    };

    let header: EnvelopeHeader =
        serde_json::from_str(&content).map_err(|e| incompatible(format!("not a model file: {}", e)))?;

    match header.format.as_deref() {
        Some(FORMAT_MAGIC) => {}
        Some(other) => return Err(incompatible(format!("unknown format tag '{}'", other))),
        None => return Err(incompatible("missing format tag".to_string())),
    }

    let raw_version = header
        .format_version
        .ok_or_else(|| incompatible("missing format_version".to_string()))?;
    let version = ModelVersion::parse(&raw_version)
        .map_err(|_| incompatible(format!("unrecognized format_version '{}'", raw_version)))?;
    if !version.is_readable_by(&ModelVersion::CURRENT) {
        return Err(incompatible(format!(
            "format_version {} is not supported by reader {}",
            version,
            ModelVersion::CURRENT
        )));
    }

    let envelope: EnvelopeIn =
        serde_json::from_str(&content).map_err(|e| incompatible(format!("malformed model body: {}", e)))?;
    envelope
        .model
        .validate()
        .map_err(|e| incompatible(e.to_string()))?;

    tracing::info!(
        path = %shown,
        version = %version,
        n_targets = envelope.model.n_targets(),
        "Loaded model"
    );
    Ok(envelope.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RaksorError::ModelNotFound { .. }));
    }

    #[test]
    fn test_garbage_is_incompatible() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();
        let err = load_model(file.path()).unwrap_err();
        assert!(matches!(err, RaksorError::ModelIncompatible { .. }));
    }

    #[test]
    fn test_unknown_magic_is_incompatible() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"format": "other", "format_version": "1.0.0", "model": {{}}}}"#).unwrap();
        let err = load_model(file.path()).unwrap_err();
        assert!(err.to_string().contains("unknown format tag"));
    }

    #[test]
    fn test_future_version_is_incompatible() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"format": "raksor-model", "format_version": "2.0.0", "model": {{}}}}"#).unwrap();
        let err = load_model(file.path()).unwrap_err();
        assert!(matches!(err, RaksorError::ModelIncompatible { .. }));
        assert!(err.to_string().contains("2.0.0"));
    }
}
