//! ChurnIQ Library
//!
//! Customer churn risk scoring with a pre-trained classifier: single-customer
//! assessments, batch CSV scoring with risk buckets, and an HTTP dashboard.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod types;
pub mod web;

pub use batch::{BatchReport, UploadedTable};
pub use config::AppConfig;
pub use error::ChurnError;
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use types::{CustomerSignals, FeatureSchema, RiskBucket, SingleAssessment};
