//! Uploaded customer tables and scored batch results

use crate::error::{ChurnError, Result};
use crate::types::prediction::RiskBucket;
use chrono::{DateTime, Utc};
use csv::StringRecord;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use uuid::Uuid;

/// Column appended with the churn probability
pub const PROBABILITY_COLUMN: &str = "churn_probability";
/// Column appended with the risk bucket label
pub const BUCKET_COLUMN: &str = "risk_bucket";

/// A delimited table as uploaded, cells kept as text
#[derive(Debug, Clone)]
pub struct UploadedTable {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl UploadedTable {
    /// Parse comma-separated text with a header row
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ChurnError::Parse("upload has no header row".to_string()));
        }

        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        if records.is_empty() {
            return Err(ChurnError::Parse("upload contains no data rows".to_string()));
        }

        Ok(Self { headers, records })
    }

    /// Read a table from a file on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| ChurnError::Parse(format!("cannot open {}: {}", path.display(), e)))?;
        Self::parse(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Index of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First `n` rows as plain strings
    pub fn head(&self, n: usize) -> Vec<Vec<String>> {
        self.records
            .iter()
            .take(n)
            .map(|r| r.iter().map(str::to_string).collect())
            .collect()
    }
}

/// Probability and bucket for one uploaded row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredRow {
    pub churn_probability: f64,
    pub risk_bucket: RiskBucket,
}

/// Customers per risk bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl BucketCounts {
    pub fn from_rows(rows: &[ScoredRow]) -> Self {
        let mut counts = Self::default();
        for row in rows {
            counts.add(row.risk_bucket, 1);
        }
        counts
    }

    pub fn add(&mut self, bucket: RiskBucket, n: u64) {
        match bucket {
            RiskBucket::Low => self.low += n,
            RiskBucket::Medium => self.medium += n,
            RiskBucket::High => self.high += n,
        }
    }

    pub fn get(&self, bucket: RiskBucket) -> u64 {
        match bucket {
            RiskBucket::Low => self.low,
            RiskBucket::Medium => self.medium,
            RiskBucket::High => self.high,
        }
    }

    pub fn total(&self) -> u64 {
        self.low + self.medium + self.high
    }

    /// Buckets with at least one customer, lowest risk first
    pub fn present(&self) -> Vec<(RiskBucket, u64)> {
        RiskBucket::ALL
            .iter()
            .map(|&b| (b, self.get(b)))
            .filter(|&(_, n)| n > 0)
            .collect()
    }
}

/// A fully scored upload
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub scored_at: DateTime<Utc>,
    table: UploadedTable,
    scores: Vec<ScoredRow>,
}

impl BatchReport {
    /// Pair an upload with one score per row
    pub fn new(table: UploadedTable, scores: Vec<ScoredRow>) -> Result<Self> {
        if scores.len() != table.row_count() {
            return Err(ChurnError::Inference(format!(
                "classifier returned {} probabilities for {} rows",
                scores.len(),
                table.row_count()
            )));
        }
        Ok(Self {
            batch_id: Uuid::new_v4(),
            scored_at: Utc::now(),
            table,
            scores,
        })
    }

    pub fn row_count(&self) -> usize {
        self.scores.len()
    }

    pub fn scores(&self) -> &[ScoredRow] {
        &self.scores
    }

    pub fn bucket_counts(&self) -> BucketCounts {
        BucketCounts::from_rows(&self.scores)
    }

    /// Output header: uploaded columns, then probability and bucket.
    ///
    /// A result column already present in the upload is overwritten in place.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.table.headers().to_vec();
        for column in [PROBABILITY_COLUMN, BUCKET_COLUMN] {
            if self.table.column_index(column).is_none() {
                headers.push(column.to_string());
            }
        }
        headers
    }

    /// Output row `i` as strings
    pub fn row(&self, i: usize) -> Vec<String> {
        let mut fields: Vec<String> = self.table.records()[i].iter().map(str::to_string).collect();
        let score = &self.scores[i];
        let values = [
            (PROBABILITY_COLUMN, format_probability(score.churn_probability)),
            (BUCKET_COLUMN, score.risk_bucket.label().to_string()),
        ];
        for (column, value) in values {
            match self.table.column_index(column) {
                Some(idx) if idx < fields.len() => fields[idx] = value,
                _ => fields.push(value),
            }
        }
        fields
    }

    /// First `n` scored rows
    pub fn preview(&self, n: usize) -> Vec<Vec<String>> {
        (0..self.row_count().min(n)).map(|i| self.row(i)).collect()
    }

    /// Full scored table as comma-separated UTF-8 with a header row
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(self.headers())
            .map_err(|e| ChurnError::Export(e.to_string()))?;
        for i in 0..self.row_count() {
            wtr.write_record(self.row(i))
                .map_err(|e| ChurnError::Export(e.to_string()))?;
        }
        wtr.into_inner()
            .map_err(|e| ChurnError::Export(e.to_string()))
    }
}

fn format_probability(p: f64) -> String {
    format!("{:.6}", p)
}
