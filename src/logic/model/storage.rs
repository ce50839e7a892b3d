//! Model artifact storage
//!
//! Every fitted model is written as a JSON envelope carrying the feature
//! layout version + hash. Loading validates the envelope before handing
//! the payload back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::layout::{layout_hash, validate_layout, FEATURE_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub kind: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> Artifact<T> {
    pub fn new(kind: &str, payload: T) -> Self {
        Self {
            kind: kind.to_string(),
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            created_at: Utc::now(),
            payload,
        }
    }
}

/// `{prefix}_{suffix}.json`
pub fn artifact_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('_');
    name.push_str(suffix);
    name.push_str(".json");
    prefix.with_file_name(name)
}

/// Save an artifact to disk
pub fn save_artifact<T: Serialize>(path: &Path, kind: &str, payload: &T) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_vec_pretty(&Artifact::new(kind, payload))?;
    fs::write(path, json)?;
    Ok(())
}

/// Load an artifact from disk with kind and layout validation
pub fn load_artifact<T: DeserializeOwned>(path: &Path, kind: &str) -> PipelineResult<T> {
    let data = fs::read(path)?;
    let artifact: Artifact<T> = serde_json::from_slice(&data)?;

    if artifact.kind != kind {
        return Err(PipelineError::InvalidParameter(format!(
            "artifact {} holds '{}', expected '{}'",
            path.display(),
            artifact.kind,
            kind
        )));
    }
    validate_layout(artifact.feature_version, artifact.layout_hash)?;

    Ok(artifact.payload)
}
