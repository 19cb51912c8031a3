//! Feature extraction for churn model inference.
//!
//! Aligns single-customer inputs and uploaded tables to the feature schema
//! the classifier was trained on.

use crate::batch::UploadedTable;
use crate::error::{ChurnError, Result};
use crate::types::customer::CustomerSignals;
use crate::types::schema::FeatureSchema;
use std::sync::Arc;

/// Columns overwritten from single-customer inputs, in input order
pub const SIGNAL_COLUMNS: [&str; 7] = [
    "tenure",
    "MonthlyCharges",
    "is_month_to_month",
    "fiber_risk_flag",
    "support_gap",
    "manual_payment_flag",
    "service_complexity_score",
];

/// One schema-aligned row of model input
#[derive(Debug, Clone)]
pub struct FeatureVector<'a> {
    schema: &'a FeatureSchema,
    values: Vec<f32>,
}

impl<'a> FeatureVector<'a> {
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn columns(&self) -> &[String] {
        self.schema.names()
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f32> {
        self.schema.position(name).map(|i| self.values[i])
    }

    pub fn into_matrix(self) -> FeatureMatrix {
        FeatureMatrix {
            rows: 1,
            cols: self.values.len(),
            data: self.values,
        }
    }
}

/// Row-major matrix of schema-aligned features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FeatureMatrix {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

/// Feature extractor that transforms inputs into model input features.
///
/// Features are produced in the exact order of the loaded schema.
pub struct FeatureExtractor {
    schema: Arc<FeatureSchema>,
    /// Schema position of each entry in [`SIGNAL_COLUMNS`]
    signal_positions: [usize; 7],
}

impl FeatureExtractor {
    /// Create an extractor for a schema.
    ///
    /// The schema must contain every single-customer signal column.
    pub fn new(schema: Arc<FeatureSchema>) -> Result<Self> {
        let missing: Vec<&str> = SIGNAL_COLUMNS
            .iter()
            .copied()
            .filter(|c| !schema.contains(c))
            .collect();
        if !missing.is_empty() {
            return Err(ChurnError::Artifact(format!(
                "feature schema lacks single-customer columns: {}",
                missing.join(", ")
            )));
        }

        let mut signal_positions = [0usize; 7];
        for (slot, column) in signal_positions.iter_mut().zip(SIGNAL_COLUMNS.iter()) {
            *slot = schema.position(column).unwrap_or_default();
        }

        Ok(Self {
            schema,
            signal_positions,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Build a feature vector for one customer.
    ///
    /// Every schema column starts at 0; the seven signal columns are then
    /// overwritten, booleans as 0/1.
    pub fn extract(&self, signals: &CustomerSignals) -> FeatureVector<'_> {
        let mut values = vec![0.0_f32; self.schema.len()];

        let supplied = [
            signals.tenure as f32,
            signals.monthly_charges as f32,
            flag(signals.is_month_to_month),
            flag(signals.fiber_internet),
            flag(signals.no_tech_support),
            flag(signals.manual_payment),
            signals.service_complexity as f32,
        ];
        for (&position, value) in self.signal_positions.iter().zip(supplied) {
            values[position] = value;
        }

        FeatureVector {
            schema: &self.schema,
            values,
        }
    }

    /// Select the schema columns of an uploaded table, in schema order.
    ///
    /// Extra columns are ignored. Missing columns abort with the full list.
    pub fn extract_table(&self, table: &UploadedTable) -> Result<FeatureMatrix> {
        let missing = self.schema.missing_from(table.headers());
        if !missing.is_empty() {
            return Err(ChurnError::MissingColumns { missing });
        }

        let column_indices: Vec<usize> = self
            .schema
            .names()
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect();

        let cols = column_indices.len();
        let mut data = Vec::with_capacity(table.row_count() * cols);
        for (row_idx, record) in table.records().iter().enumerate() {
            for (&col_idx, name) in column_indices.iter().zip(self.schema.names()) {
                let raw = record.get(col_idx).unwrap_or("");
                let value = parse_cell(raw).ok_or_else(|| {
                    ChurnError::Parse(format!(
                        "row {}: column '{}' has non-numeric value '{}'",
                        row_idx + 1,
                        name,
                        raw
                    ))
                })?;
                data.push(value);
            }
        }

        Ok(FeatureMatrix {
            rows: table.row_count(),
            cols,
            data,
        })
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Parse a numeric or boolean cell
fn parse_cell(raw: &str) -> Option<f32> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("true") {
        return Some(1.0);
    }
    if s.eq_ignore_ascii_case("false") {
        return Some(0.0);
    }
    s.parse::<f32>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(names: &[&str]) -> FeatureExtractor {
        let schema = FeatureSchema::new(names.iter().map(|s| s.to_string()).collect()).unwrap();
        FeatureExtractor::new(Arc::new(schema)).unwrap()
    }

    fn full_schema() -> Vec<&'static str> {
        let mut names = vec!["SeniorCitizen", "TotalCharges"];
        names.extend_from_slice(&SIGNAL_COLUMNS);
        names.push("avg_monthly_spend");
        names
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = extractor(&full_schema());
        let signals = CustomerSignals {
            tenure: 24,
            monthly_charges: 95,
            is_month_to_month: true,
            fiber_internet: false,
            no_tech_support: true,
            manual_payment: false,
            service_complexity: 5,
        };

        let vector = extractor.extract(&signals);

        assert_eq!(vector.values().len(), extractor.feature_count());
        assert_eq!(vector.get("tenure"), Some(24.0));
        assert_eq!(vector.get("MonthlyCharges"), Some(95.0));
        assert_eq!(vector.get("is_month_to_month"), Some(1.0));
        assert_eq!(vector.get("fiber_risk_flag"), Some(0.0));
        assert_eq!(vector.get("support_gap"), Some(1.0));
        assert_eq!(vector.get("manual_payment_flag"), Some(0.0));
        assert_eq!(vector.get("service_complexity_score"), Some(5.0));
    }

    #[test]
    fn test_unset_columns_default_to_zero() {
        let extractor = extractor(&full_schema());

        for tenure in [0, 36, 72] {
            for monthly_charges in [20, 70, 120] {
                for mask in 0..16u8 {
                    let signals = CustomerSignals {
                        tenure,
                        monthly_charges,
                        is_month_to_month: mask & 1 != 0,
                        fiber_internet: mask & 2 != 0,
                        no_tech_support: mask & 4 != 0,
                        manual_payment: mask & 8 != 0,
                        service_complexity: (mask % 7) as u32,
                    };
                    let vector = extractor.extract(&signals);

                    assert_eq!(vector.columns(), extractor.schema().names());
                    for name in ["SeniorCitizen", "TotalCharges", "avg_monthly_spend"] {
                        assert_eq!(vector.get(name), Some(0.0));
                    }
                    assert_eq!(vector.get("tenure"), Some(tenure as f32));
                    assert_eq!(vector.get("fiber_risk_flag"), Some(((mask >> 1) & 1) as f32));
                }
            }
        }
    }

    #[test]
    fn test_schema_without_signal_columns_is_rejected() {
        let schema = FeatureSchema::new(vec!["tenure".to_string()]).unwrap();
        let result = FeatureExtractor::new(Arc::new(schema));
        assert!(matches!(result, Err(ChurnError::Artifact(_))));
    }

    #[test]
    fn test_extract_table_selects_schema_order() {
        let extractor = extractor(&SIGNAL_COLUMNS);
        let csv = "customerID,service_complexity_score,manual_payment_flag,support_gap,\
                   fiber_risk_flag,is_month_to_month,MonthlyCharges,tenure\n\
                   A-1,3,1,0,True,false,80.5,10\n\
                   A-2,0,0,1,0,1,25,60\n";
        let table = UploadedTable::parse(csv.as_bytes()).unwrap();

        let matrix = extractor.extract_table(&table).unwrap();

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 7);
        assert_eq!(matrix.row(0), &[10.0, 80.5, 0.0, 1.0, 0.0, 1.0, 3.0]);
        assert_eq!(matrix.row(1), &[60.0, 25.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_extract_table_reports_missing_columns() {
        let extractor = extractor(&SIGNAL_COLUMNS);
        let table = UploadedTable::parse("tenure,support_gap,other\n1,0,x\n".as_bytes()).unwrap();

        match extractor.extract_table(&table) {
            Err(ChurnError::MissingColumns { missing }) => assert_eq!(
                missing,
                vec![
                    "MonthlyCharges",
                    "is_month_to_month",
                    "fiber_risk_flag",
                    "manual_payment_flag",
                    "service_complexity_score",
                ]
            ),
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_padded_header_does_not_match() {
        let extractor = extractor(&SIGNAL_COLUMNS);
        let csv = " tenure ,MonthlyCharges,is_month_to_month,fiber_risk_flag,support_gap,\
                   manual_payment_flag,service_complexity_score\n\
                   1,20,0,0,0,0,1\n";
        let table = UploadedTable::parse(csv.as_bytes()).unwrap();

        match extractor.extract_table(&table) {
            Err(ChurnError::MissingColumns { missing }) => assert_eq!(missing, vec!["tenure"]),
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_table_rejects_bad_cell() {
        let extractor = extractor(&SIGNAL_COLUMNS);
        let csv = "tenure,MonthlyCharges,is_month_to_month,fiber_risk_flag,support_gap,\
                   manual_payment_flag,service_complexity_score\n\
                   1,20,0,0,0,0,1\n\
                   2,,0,0,0,0,1\n";
        let table = UploadedTable::parse(csv.as_bytes()).unwrap();

        let err = extractor.extract_table(&table).unwrap_err();
        assert!(matches!(err, ChurnError::Parse(_)));
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("MonthlyCharges"));
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(" 1.5 "), Some(1.5));
        assert_eq!(parse_cell("TRUE"), Some(1.0));
        assert_eq!(parse_cell("False"), Some(0.0));
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("NaN"), None);
        assert_eq!(parse_cell("abc"), None);
    }
}
