//! Prediction, risk bucket and verdict data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-way risk classification used for batch results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    /// All buckets, lowest risk first
    pub const ALL: [RiskBucket; 3] = [RiskBucket::Low, RiskBucket::Medium, RiskBucket::High];

    /// Determine the bucket from a churn probability and thresholds
    pub fn from_probability(probability: f64, thresholds: &RiskBucketThresholds) -> Self {
        if probability >= thresholds.high {
            RiskBucket::High
        } else if probability >= thresholds.medium {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }

    /// Display label written to the `risk_bucket` column
    pub fn label(&self) -> &'static str {
        match self {
            RiskBucket::Low => "Low Risk",
            RiskBucket::Medium => "Medium Risk",
            RiskBucket::High => "High Risk",
        }
    }

    /// Position in [`RiskBucket::ALL`]
    pub fn index(&self) -> usize {
        match self {
            RiskBucket::Low => 0,
            RiskBucket::Medium => 1,
            RiskBucket::High => 2,
        }
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Configurable lower bounds of the medium and high buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBucketThresholds {
    pub medium: f64,
    pub high: f64,
}

impl RiskBucketThresholds {
    /// Check that `0 <= medium <= high <= 1`
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.medium) || !(0.0..=1.0).contains(&self.high) {
            anyhow::bail!(
                "risk bucket thresholds must lie in [0, 1] (medium={}, high={})",
                self.medium,
                self.high
            );
        }
        if self.medium > self.high {
            anyhow::bail!(
                "medium threshold {} exceeds high threshold {}",
                self.medium,
                self.high
            );
        }
        Ok(())
    }
}

impl Default for RiskBucketThresholds {
    fn default() -> Self {
        Self {
            medium: 0.4,
            high: 0.7,
        }
    }
}

/// Two-way verdict shown for a single customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    HighRisk,
    Stable,
}

impl Verdict {
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            Verdict::HighRisk
        } else {
            Verdict::Stable
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Verdict::HighRisk => "High churn risk",
            Verdict::Stable => "Customer appears stable",
        }
    }
}

/// Outcome of scoring one manually entered customer
#[derive(Debug, Clone, Serialize)]
pub struct SingleAssessment {
    /// Churn probability (0.0 - 1.0)
    pub churn_probability: f64,
    /// Probability scaled to the 0-100 gauge
    pub gauge_value: f64,
    pub verdict: Verdict,
    pub verdict_message: &'static str,
    pub scored_at: DateTime<Utc>,
}

impl SingleAssessment {
    pub fn new(churn_probability: f64, verdict_threshold: f64) -> Self {
        let verdict = Verdict::from_probability(churn_probability, verdict_threshold);
        Self {
            churn_probability,
            gauge_value: churn_probability * 100.0,
            verdict,
            verdict_message: verdict.message(),
            scored_at: Utc::now(),
        }
    }
}
