//! Model loading for the CLI.
//!
//! This module handles:
//! - Model path resolution (CLI > env > XDG > /etc)
//! - Reading and hashing the model file for provenance
//! - Semantic validation via gm-config
//! - Building the in-memory mixture model

pub use gm_config::{ConfigSource, ModelFile, ValidationError};

use crate::classify::Region;
use gm_common::{Result as CoreResult, Taxonomy};
use gm_config::{resolve_model_path, validate_model};
use gm_math::MixtureModel;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while locating and reading a model file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no model file found; pass --model or set {}", gm_config::resolve::ENV_MODEL_PATH)]
    NotFound,

    #[error("Invalid JSON in model file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Model resolution options.
#[derive(Debug, Default, Clone)]
pub struct ModelOptions {
    /// Explicit model path (highest priority).
    pub model_path: Option<PathBuf>,
}

/// A validated model file with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub file: ModelFile,
    pub path: PathBuf,
    pub source: ConfigSource,
    /// SHA-256 of the file bytes, hex encoded.
    pub hash: String,
}

/// Provenance block for reports.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSnapshot {
    pub path: PathBuf,
    pub source: String,
    pub hash: String,
    pub schema_version: String,
    pub description: Option<String>,
    /// When the parameters were fitted, as recorded by the exporter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A built model and its taxonomy.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: Arc<MixtureModel<Region>>,
    pub taxonomy: Taxonomy,
}

impl ResolvedModel {
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            path: self.path.clone(),
            source: self.source.to_string(),
            hash: self.hash.clone(),
            schema_version: self.file.schema_version.clone(),
            description: self.file.description.clone(),
            created_at: self.file.created_at.clone(),
        }
    }

    /// Build the mixture model. Distribution sums are checked here.
    pub fn build(&self) -> CoreResult<LoadedModel> {
        let file = &self.file;
        let taxonomy = Taxonomy::new(file.class_labels.iter().cloned())?;
        let regions: Vec<Region> = file.symbols.iter().cloned().map(Region::from).collect();
        let model = MixtureModel::with_tolerance(
            regions,
            file.p_w_given_z.clone(),
            file.p_z_given_c.clone(),
            file.p_c.clone(),
            file.tolerance(),
        )?;
        debug!(
            symbols = model.number_of_symbols(),
            topics = model.number_of_topics(),
            classes = model.number_of_classes(),
            "mixture model built"
        );
        Ok(LoadedModel {
            model: Arc::new(model),
            taxonomy,
        })
    }
}

/// Locate, read, hash and validate the model file.
pub fn load_model(options: &ModelOptions) -> Result<ResolvedModel, ConfigError> {
    let resolved = resolve_model_path(options.model_path.as_deref());
    let path = resolved.path.ok_or(ConfigError::NotFound)?;
    debug!(path = %path.display(), source = %resolved.source, "model path resolved");

    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
        path: path.clone(),
        source: e,
    })?;
    let hash = compute_hash(&content);

    let file: ModelFile = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    validate_model(&file)?;

    info!(path = %path.display(), hash = %hash, "model file loaded");
    Ok(ResolvedModel {
        file,
        path,
        source: resolved.source,
        hash,
    })
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
