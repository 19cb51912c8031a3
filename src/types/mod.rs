//! Type definitions for churn scoring

pub mod customer;
pub mod prediction;
pub mod schema;

pub use customer::CustomerSignals;
pub use prediction::{RiskBucket, RiskBucketThresholds, SingleAssessment, Verdict};
pub use schema::FeatureSchema;
