//! Model file types.
//!
//! A model file carries the three fitted distributions of the class → topic →
//! symbol chain plus the class labels and symbol payloads:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "class_labels": ["resident", "visitor"],
//!   "symbols": [
//!     {"name": "old_town", "bbox": [46.50, 6.62, 46.53, 6.65]},
//!     {"name": "lakeside", "bbox": [46.49, 6.60, 46.51, 6.66]}
//!   ],
//!   "p_c": [0.6, 0.4],
//!   "p_z_given_c": [[0.8, 0.2], [0.3, 0.7]],
//!   "p_w_given_z": [[0.9, 0.1], [0.2, 0.8]]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::ValidationError;

/// Complete model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    /// Class labels in class-id order.
    pub class_labels: Vec<String>,

    /// Symbols in symbol-id order.
    pub symbols: Vec<SymbolSpec>,

    /// P(c), one entry per class.
    pub p_c: Vec<f64>,

    /// P(z|c), one row per class, one entry per topic.
    pub p_z_given_c: Vec<Vec<f64>>,

    /// P(w|z), one row per topic, one entry per symbol.
    pub p_w_given_z: Vec<Vec<f64>>,

    /// Tolerance for distribution sum checks.
    #[serde(default)]
    pub tolerance: Option<f64>,
}

/// One symbol (a geographic sub-area in the common case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub name: String,

    /// `[min_lat, min_lon, max_lat, max_lon]`.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

impl ModelFile {
    /// Load a model file from disk.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse a model file from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Tolerance to check sums against.
    pub fn tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(crate::DEFAULT_TOLERANCE)
    }

    /// Number of topics declared by `p_w_given_z`.
    pub fn number_of_topics(&self) -> usize {
        self.p_w_given_z.len()
    }

    /// Whether every symbol carries a bounding box.
    pub fn has_bounding_boxes(&self) -> bool {
        !self.symbols.is_empty() && self.symbols.iter().all(|s| s.bbox.is_some())
    }
}
