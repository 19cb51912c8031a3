//! ONNX Runtime backed classifier

use crate::feature_extractor::FeatureMatrix;
use crate::models::classifier::Classifier;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// ONNX export of the fitted churn classifier
pub struct OnnxClassifier {
    /// Model name
    name: String,
    /// ONNX Runtime session (running requires exclusive access)
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for probabilities
    output_name: String,
}

impl OnnxClassifier {
    /// Load an ONNX model from file
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx_model")
            .to_string();

        ort::init().commit()?;
        info!(model = %name, path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Extract churn probabilities from model outputs.
    /// Handles tensor outputs and seq(map) outputs (ZipMap exports).
    fn extract_probabilities(
        &self,
        outputs: &ort::session::SessionOutputs,
        rows: usize,
    ) -> Result<Vec<f64>> {
        if let Some(output) = outputs.get(&self.output_name) {
            let dtype = output.dtype();

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                return probabilities_from_tensor(&dims, data, rows);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                return self.extract_from_sequence_map(output, rows);
            }
        }

        // Fallback: first non-label output that yields probabilities
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }

            let dtype = output.dtype();

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                debug!(model = %self.name, output = %name, "Extracting from fallback tensor");
                let dims: Vec<i64> = shape.iter().copied().collect();
                return probabilities_from_tensor(&dims, data, rows);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(probs) = self.extract_from_sequence_map(&output, rows) {
                    return Ok(probs);
                }
            }
        }

        anyhow::bail!("model {} produced no probability output", self.name)
    }

    /// Extract class-1 probabilities from seq(map(int64, float)), one map per row
    fn extract_from_sequence_map(&self, output: &ort::value::DynValue, rows: usize) -> Result<Vec<f64>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        if maps.len() != rows {
            anyhow::bail!("expected {} probability maps, got {}", rows, maps.len());
        }

        let mut probabilities = Vec::with_capacity(rows);
        for map_value in &maps {
            let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

            let churn = kv_pairs
                .iter()
                .find(|(class_id, _)| *class_id == 1)
                .map(|(_, p)| *p as f64)
                .or_else(|| {
                    kv_pairs
                        .iter()
                        .find(|(class_id, _)| *class_id == 0)
                        .map(|(_, p)| 1.0 - *p as f64)
                })
                .ok_or_else(|| anyhow::anyhow!("No probability found in map"))?;
            probabilities.push(churn);
        }

        Ok(probabilities)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        use ort::value::Tensor;

        // Input tensor of shape [rows, num_features]
        let shape = vec![features.rows() as i64, features.cols() as i64];
        let input_tensor = Tensor::from_array((shape, features.data().to_vec()))
            .context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;

        self.extract_probabilities(&outputs, features.rows())
    }
}

/// Read the positive-class column from a probability tensor
fn probabilities_from_tensor(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<f64>> {
    match dims {
        // [batch, num_classes]
        &[n, k] if n as usize == rows && k >= 2 => {
            let k = k as usize;
            Ok((0..rows).map(|i| data[i * k + 1] as f64).collect())
        }
        // [batch, 1] or [batch]: a single probability per row
        &[n, 1] | &[n] if n as usize == rows => {
            Ok(data.iter().take(rows).map(|&v| v as f64).collect())
        }
        _ => anyhow::bail!("unexpected probability shape {:?} for {} rows", dims, rows),
    }
}
