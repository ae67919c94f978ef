//! Class taxonomy: the fixed, ordered set of class labels.
//!
//! Class ids are positions in the label list. Every classifier registered with
//! one evaluation run must report the same labels in the same order, and every
//! ground-truth label in a dataset must resolve to one of them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ordered class labels; the index of a label is its class id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Taxonomy {
    labels: Vec<String>,
}

impl Taxonomy {
    /// Create a taxonomy. Labels must be non-empty and unique.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::Config("taxonomy has no class labels".to_string()));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(Error::Config(format!("class label {} is blank", i)));
            }
            if labels[..i].contains(label) {
                return Err(Error::Config(format!("duplicate class label: {}", label)));
            }
        }
        Ok(Self { labels })
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; a taxonomy holds at least one class.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in class-id order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label of a class id.
    pub fn label(&self, class: usize) -> Option<&str> {
        self.labels.get(class).map(String::as_str)
    }

    /// Class id of a raw category token.
    ///
    /// Unknown tokens are an error, never a default class.
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| Error::UnknownCategory {
                label: label.to_string(),
            })
    }

    /// Check that another label sequence is identical, order included.
    pub fn ensure_matches(&self, count: usize, labels: &[String]) -> Result<()> {
        if count != self.labels.len() || labels != self.labels.as_slice() {
            return Err(Error::TaxonomyMismatch {
                expected: self.labels.clone(),
                actual: labels.to_vec(),
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for Taxonomy {
    type Error = Error;

    fn try_from(labels: Vec<String>) -> Result<Self> {
        Taxonomy::new(labels)
    }
}

impl From<Taxonomy> for Vec<String> {
    fn from(taxonomy: Taxonomy) -> Self {
        taxonomy.labels
    }
}
