//! Ordered feature schema the classifier was trained on

use crate::error::{ChurnError, Result};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Ordered, named set of feature columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from ordered column names.
    ///
    /// Fails on an empty list or repeated names.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(ChurnError::Artifact("feature schema is empty".to_string()));
        }

        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(ChurnError::Artifact(format!(
                    "feature schema lists '{}' more than once",
                    name
                )));
            }
        }

        Ok(Self { names, positions })
    }

    /// Load a schema stored as a JSON array of column names
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::Artifact(format!("cannot read feature names {}: {}", path.display(), e))
        })?;
        let names: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            ChurnError::Artifact(format!(
                "feature names {} is not a JSON array of strings: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a column within the schema
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Schema columns absent from `columns`, in schema order
    pub fn missing_from<S: AsRef<str>>(&self, columns: &[S]) -> Vec<String> {
        let present: HashSet<&str> = columns.iter().map(|c| c.as_ref()).collect();
        self.names
            .iter()
            .filter(|name| !present.contains(name.as_str()))
            .cloned()
            .collect()
    }
}
