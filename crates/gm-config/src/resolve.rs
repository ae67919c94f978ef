//! Model path resolution.
//!
//! Resolution order: CLI argument → environment variables → XDG path → system path → none.

use std::path::{Path, PathBuf};

/// Where a model file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/geomix/.
    SystemConfig,

    /// Nothing found.
    #[default]
    NotFound,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::NotFound => write!(f, "not found"),
        }
    }
}

/// A resolved model path with its provenance.
#[derive(Debug, Clone, Default)]
pub struct ModelPath {
    /// Path to model.json (or None if not found).
    pub path: Option<PathBuf>,

    /// Source of the path (for diagnostics).
    pub source: ConfigSource,
}

/// Environment variable names.
pub const ENV_MODEL_PATH: &str = "GEOMIX_MODEL";
pub const ENV_CONFIG_DIR: &str = "GEOMIX_CONFIG_DIR";

/// Standard model file name.
const MODEL_FILENAME: &str = "model.json";

/// Application name for XDG directories.
const APP_NAME: &str = "geomix";

/// Resolve the model path.
///
/// Resolution order:
/// 1. Explicit CLI path (returned even if missing, so the caller reports it)
/// 2. `GEOMIX_MODEL` environment variable
/// 3. `GEOMIX_CONFIG_DIR` environment variable + model.json
/// 4. XDG config directory (~/.config/geomix/model.json)
/// 5. System config (/etc/geomix/model.json)
pub fn resolve_model_path(cli_path: Option<&Path>) -> ModelPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return ModelPath {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_MODEL_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(MODEL_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(MODEL_FILENAME);
        if path.exists() {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    // 5. System config
    let system_path = system_config_dir().join(MODEL_FILENAME);
    if system_path.exists() {
        return found(system_path, ConfigSource::SystemConfig);
    }

    ModelPath::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ModelPath {
    ModelPath {
        path: Some(path),
        source,
    }
}

/// Get the XDG config directory for geomix.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
