//! Churn model loading and inference

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod onnx;

pub use classifier::{Classifier, LinearClassifier};
pub use inference::InferenceEngine;
pub use loader::ModelLoader;
pub use onnx::OnnxClassifier;
