//! Model artifact loader

use crate::error::{ChurnError, Result};
use crate::models::classifier::{Classifier, LinearClassifier};
use crate::models::onnx::OnnxClassifier;
use crate::types::schema::FeatureSchema;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Classifier and schema loaded at startup
pub struct LoadedArtifacts {
    pub classifier: Box<dyn Classifier>,
    pub schema: Arc<FeatureSchema>,
}

/// Loader for the persisted classifier and its feature names
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load both artifacts; either one missing is fatal
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        model_path: P,
        feature_names_path: Q,
    ) -> Result<LoadedArtifacts> {
        let schema = Arc::new(self.load_schema(feature_names_path)?);
        let classifier = self.load_classifier(model_path, &schema)?;

        info!(
            model = %classifier.name(),
            features = schema.len(),
            "Model artifacts loaded"
        );

        Ok(LoadedArtifacts { classifier, schema })
    }

    /// Load the ordered feature names
    pub fn load_schema<P: AsRef<Path>>(&self, path: P) -> Result<FeatureSchema> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading feature schema");
        FeatureSchema::load(path)
    }

    /// Load the classifier, picking the format from the file extension
    pub fn load_classifier<P: AsRef<Path>>(
        &self,
        path: P,
        schema: &FeatureSchema,
    ) -> Result<Box<dyn Classifier>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::Artifact(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "onnx" => {
                let model = OnnxClassifier::load(path, self.onnx_threads)
                    .map_err(|e| ChurnError::Artifact(format!("{:#}", e)))?;
                Ok(Box::new(model))
            }
            "json" => {
                info!(path = %path.display(), "Loading logistic regression model");
                Ok(Box::new(LinearClassifier::load(path, schema)?))
            }
            other => Err(ChurnError::Artifact(format!(
                "unsupported model format '.{}' (expected .onnx or .json)",
                other
            ))),
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
