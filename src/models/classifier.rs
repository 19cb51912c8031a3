//! Classifier abstraction and the logistic-regression artifact

use crate::error::{ChurnError, Result};
use crate::feature_extractor::FeatureMatrix;
use crate::types::schema::FeatureSchema;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A fitted binary classifier
pub trait Classifier: Send + Sync {
    /// Model name for logs and health reporting
    fn name(&self) -> &str;

    /// Probability of the positive (churn) class for every row
    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>>;
}

/// On-disk logistic regression: coefficients keyed by feature name
#[derive(Debug, Deserialize)]
struct LinearArtifact {
    intercept: f64,
    coefficients: BTreeMap<String, f64>,
}

/// Logistic regression aligned to a feature schema
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    name: String,
    intercept: f64,
    /// One weight per schema column, in schema order
    weights: Vec<f64>,
}

impl LinearClassifier {
    /// Align named coefficients to the schema.
    ///
    /// Schema columns without a coefficient get weight 0.
    pub fn new(
        name: &str,
        intercept: f64,
        coefficients: &BTreeMap<String, f64>,
        schema: &FeatureSchema,
    ) -> Result<Self> {
        let unknown: Vec<&str> = coefficients
            .keys()
            .filter(|k| !schema.contains(k))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ChurnError::Artifact(format!(
                "coefficients for columns not in the feature schema: {}",
                unknown.join(", ")
            )));
        }

        let weights = schema
            .names()
            .iter()
            .map(|n| coefficients.get(n).copied().unwrap_or(0.0))
            .collect();

        Ok(Self {
            name: name.to_string(),
            intercept,
            weights,
        })
    }

    /// Load a JSON export `{"intercept": .., "coefficients": {..}}`
    pub fn load<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::Artifact(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let artifact: LinearArtifact = serde_json::from_str(&raw).map_err(|e| {
            ChurnError::Artifact(format!("invalid model file {}: {}", path.display(), e))
        })?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("logistic_regression");
        Self::new(name, artifact.intercept, &artifact.coefficients, schema)
    }

    fn score_row(&self, row: &[f32]) -> f64 {
        let logit = self.intercept
            + self
                .weights
                .iter()
                .zip(row)
                .map(|(w, &x)| w * x as f64)
                .sum::<f64>();
        1.0 / (1.0 + (-logit).exp())
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        if features.cols() != self.weights.len() {
            anyhow::bail!(
                "expected {} features, got {}",
                self.weights.len(),
                features.cols()
            );
        }
        Ok((0..features.rows())
            .map(|i| self.score_row(features.row(i)))
            .collect())
    }
}
