//! Churn inference engine for single customers and uploaded batches

use crate::batch::{BatchReport, ScoredRow, UploadedTable};
use crate::config::{AppConfig, ScoringConfig};
use crate::error::{ChurnError, Result};
use crate::feature_extractor::{FeatureExtractor, FeatureMatrix};
use crate::models::classifier::Classifier;
use crate::models::loader::ModelLoader;
use crate::types::customer::CustomerSignals;
use crate::types::prediction::{RiskBucket, RiskBucketThresholds, SingleAssessment};
use crate::types::schema::FeatureSchema;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Scores customers with the loaded classifier.
///
/// Built once at startup and shared read-only for the life of the process.
pub struct InferenceEngine {
    classifier: Box<dyn Classifier>,
    extractor: FeatureExtractor,
    verdict_threshold: f64,
    bucket_thresholds: RiskBucketThresholds,
}

impl InferenceEngine {
    /// Load the configured artifacts and build the engine
    pub fn new(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.models.onnx_threads);
        let artifacts = loader.load(&config.models.model_path, &config.models.feature_names_path)?;
        Self::from_parts(artifacts.classifier, artifacts.schema, &config.scoring)
    }

    /// Build an engine from an already loaded classifier and schema
    pub fn from_parts(
        classifier: Box<dyn Classifier>,
        schema: Arc<FeatureSchema>,
        scoring: &ScoringConfig,
    ) -> Result<Self> {
        let extractor = FeatureExtractor::new(schema)?;

        info!(
            model = %classifier.name(),
            features = extractor.feature_count(),
            verdict_threshold = scoring.verdict_threshold,
            medium = scoring.risk_buckets.medium,
            high = scoring.risk_buckets.high,
            "Inference engine initialized"
        );

        Ok(Self {
            classifier,
            extractor,
            verdict_threshold: scoring.verdict_threshold,
            bucket_thresholds: scoring.risk_buckets.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.extractor.schema()
    }

    /// Score one manually entered customer
    pub fn predict_single(&self, signals: &CustomerSignals) -> Result<SingleAssessment> {
        signals.validate()?;

        let matrix = self.extractor.extract(signals).into_matrix();
        let probability = self
            .run(&matrix)?
            .first()
            .copied()
            .ok_or_else(|| ChurnError::Inference("classifier returned no probability".to_string()))?;

        let assessment = SingleAssessment::new(probability, self.verdict_threshold);

        debug!(
            tenure = signals.tenure,
            monthly_charges = signals.monthly_charges,
            probability = probability,
            verdict = ?assessment.verdict,
            "Single customer scored"
        );

        Ok(assessment)
    }

    /// Score every row of an uploaded table in one call
    pub fn score_table(&self, table: &UploadedTable) -> Result<Vec<ScoredRow>> {
        let matrix = self.extractor.extract_table(table)?;
        let probabilities = self.run(&matrix)?;

        Ok(probabilities
            .into_iter()
            .map(|p| ScoredRow {
                churn_probability: p,
                risk_bucket: RiskBucket::from_probability(p, &self.bucket_thresholds),
            })
            .collect())
    }

    /// Validate, score and bucket an upload
    pub fn predict_batch(&self, table: UploadedTable) -> Result<BatchReport> {
        let start_time = Instant::now();
        let scores = self.score_table(&table)?;
        let report = BatchReport::new(table, scores)?;

        let counts = report.bucket_counts();
        info!(
            batch_id = %report.batch_id,
            rows = report.row_count(),
            low = counts.low,
            medium = counts.medium,
            high = counts.high,
            processing_time_us = start_time.elapsed().as_micros() as u64,
            "Batch scored"
        );

        Ok(report)
    }

    /// Run the classifier and check its output
    fn run(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        let probabilities = self
            .classifier
            .predict_proba(matrix)
            .map_err(|e| ChurnError::Inference(format!("{:#}", e)))?;

        if probabilities.len() != matrix.rows() {
            return Err(ChurnError::Inference(format!(
                "classifier returned {} probabilities for {} rows",
                probabilities.len(),
                matrix.rows()
            )));
        }
        if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
            return Err(ChurnError::Inference(format!(
                "classifier returned non-finite probability {}",
                bad
            )));
        }

        Ok(probabilities
            .into_iter()
            .map(|p| p.clamp(0.0, 1.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::SIGNAL_COLUMNS;
    use crate::types::prediction::Verdict;

    /// Returns the row's `tenure` feature divided by 100 as the probability
    struct TenureClassifier;

    impl Classifier for TenureClassifier {
        fn name(&self) -> &str {
            "tenure_stub"
        }

        fn predict_proba(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
            Ok((0..features.rows())
                .map(|i| features.row(i)[0] as f64 / 100.0)
                .collect())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict_proba(&self, _features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
            anyhow::bail!("corrupt model")
        }
    }

    fn engine(classifier: Box<dyn Classifier>) -> InferenceEngine {
        let schema = FeatureSchema::new(SIGNAL_COLUMNS.iter().map(|s| s.to_string()).collect())
            .unwrap();
        InferenceEngine::from_parts(classifier, Arc::new(schema), &ScoringConfig::default())
            .unwrap()
    }

    fn upload(tenures: &[u32]) -> UploadedTable {
        let mut csv = String::from(
            "customerID,tenure,MonthlyCharges,is_month_to_month,fiber_risk_flag,\
             support_gap,manual_payment_flag,service_complexity_score\n",
        );
        for (i, t) in tenures.iter().enumerate() {
            csv.push_str(&format!("C{},{},50,0,0,0,0,1\n", i, t));
        }
        UploadedTable::parse(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_single_prediction_verdict() {
        let engine = engine(Box::new(TenureClassifier));

        let stable = engine
            .predict_single(&CustomerSignals {
                tenure: 39,
                ..CustomerSignals::default()
            })
            .unwrap();
        assert_eq!(stable.verdict, Verdict::Stable);
        assert!((stable.gauge_value - 39.0).abs() < 1e-4);

        let risky = engine
            .predict_single(&CustomerSignals {
                tenure: 40,
                ..CustomerSignals::default()
            })
            .unwrap();
        assert_eq!(risky.verdict, Verdict::HighRisk);
    }

    #[test]
    fn test_single_prediction_rejects_out_of_range() {
        let engine = engine(Box::new(TenureClassifier));
        let result = engine.predict_single(&CustomerSignals {
            tenure: 100,
            ..CustomerSignals::default()
        });
        assert!(matches!(result, Err(ChurnError::InvalidInput(_))));
    }

    #[test]
    fn test_batch_buckets_preserve_row_order() {
        let engine = engine(Box::new(TenureClassifier));
        let report = engine.predict_batch(upload(&[70, 10, 40, 69, 39])).unwrap();

        let buckets: Vec<RiskBucket> = report.scores().iter().map(|s| s.risk_bucket).collect();
        assert_eq!(
            buckets,
            vec![
                RiskBucket::High,
                RiskBucket::Low,
                RiskBucket::Medium,
                RiskBucket::Medium,
                RiskBucket::Low,
            ]
        );

        let counts = report.bucket_counts();
        assert_eq!((counts.low, counts.medium, counts.high), (2, 2, 1));
    }

    #[test]
    fn test_batch_missing_columns_produces_nothing() {
        let engine = engine(Box::new(TenureClassifier));
        let table = UploadedTable::parse("customerID,tenure\nC1,5\n".as_bytes()).unwrap();

        match engine.predict_batch(table) {
            Err(ChurnError::MissingColumns { missing }) => {
                assert_eq!(missing.len(), 6);
                assert!(!missing.contains(&"tenure".to_string()));
            }
            other => panic!("expected missing columns, got {:?}", other.map(|r| r.row_count())),
        }
    }

    #[test]
    fn test_classifier_failure_is_inference_error() {
        let engine = engine(Box::new(FailingClassifier));
        let err = engine.predict_batch(upload(&[1])).unwrap_err();
        assert!(matches!(err, ChurnError::Inference(_)));
        assert!(err.to_string().contains("corrupt model"));
    }
}
