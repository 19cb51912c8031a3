//! Usage metrics and statistics tracking for the churn dashboard.

use crate::batch::BucketCounts;
use crate::types::prediction::{RiskBucket, Verdict};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Keep at most this many latency samples
const MAX_SAMPLES: usize = 10_000;

/// Metrics collector for dashboard activity
pub struct DashboardMetrics {
    /// Single customers scored
    pub single_predictions: AtomicU64,
    /// Single customers flagged high risk
    pub high_risk_verdicts: AtomicU64,
    /// Uploads scored successfully
    pub batches_scored: AtomicU64,
    /// Uploads rejected (missing columns, parse errors)
    pub batches_rejected: AtomicU64,
    /// Rows scored across all uploads
    pub rows_scored: AtomicU64,
    /// Batch rows per risk bucket
    bucket_totals: [AtomicU64; 3],
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl DashboardMetrics {
    pub fn new() -> Self {
        Self {
            single_predictions: AtomicU64::new(0),
            high_risk_verdicts: AtomicU64::new(0),
            batches_scored: AtomicU64::new(0),
            batches_rejected: AtomicU64::new(0),
            rows_scored: AtomicU64::new(0),
            bucket_totals: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a scored single customer
    pub fn record_single(&self, processing_time: Duration, verdict: Verdict) {
        self.single_predictions.fetch_add(1, Ordering::Relaxed);
        if verdict == Verdict::HighRisk {
            self.high_risk_verdicts.fetch_add(1, Ordering::Relaxed);
        }
        self.record_time(processing_time);
    }

    /// Record a scored upload
    pub fn record_batch(&self, processing_time: Duration, counts: &BucketCounts) {
        self.batches_scored.fetch_add(1, Ordering::Relaxed);
        self.rows_scored.fetch_add(counts.total(), Ordering::Relaxed);
        for bucket in RiskBucket::ALL {
            self.bucket_totals[bucket.index()].fetch_add(counts.get(bucket), Ordering::Relaxed);
        }
        self.record_time(processing_time);
    }

    /// Record an upload that failed validation
    pub fn record_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    /// Batch rows per bucket since startup
    pub fn bucket_totals(&self) -> BucketCounts {
        let mut counts = BucketCounts::default();
        for bucket in RiskBucket::ALL {
            counts.add(bucket, self.bucket_totals[bucket.index()].load(Ordering::Relaxed));
        }
        counts
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.5),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_s: self.start_time.elapsed().as_secs_f64(),
            single_predictions: self.single_predictions.load(Ordering::Relaxed),
            high_risk_verdicts: self.high_risk_verdicts.load(Ordering::Relaxed),
            batches_scored: self.batches_scored.load(Ordering::Relaxed),
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            rows_scored: self.rows_scored.load(Ordering::Relaxed),
            bucket_totals: self.bucket_totals(),
            processing: self.get_processing_stats(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let buckets = &snapshot.bucket_totals;
        let pct = |n: u64| {
            if buckets.total() > 0 {
                n as f64 / buckets.total() as f64 * 100.0
            } else {
                0.0
            }
        };

        info!(
            uptime_s = format!("{:.0}", snapshot.uptime_s),
            single_predictions = snapshot.single_predictions,
            high_risk_verdicts = snapshot.high_risk_verdicts,
            batches_scored = snapshot.batches_scored,
            batches_rejected = snapshot.batches_rejected,
            rows_scored = snapshot.rows_scored,
            "Dashboard activity"
        );
        info!(
            low = format!("{} ({:.1}%)", buckets.low, pct(buckets.low)),
            medium = format!("{} ({:.1}%)", buckets.medium, pct(buckets.medium)),
            high = format!("{} ({:.1}%)", buckets.high, pct(buckets.high)),
            "Batch rows by risk bucket"
        );
        info!(
            mean_us = snapshot.processing.mean_us,
            p50_us = snapshot.processing.p50_us,
            p95_us = snapshot.processing.p95_us,
            p99_us = snapshot.processing.p99_us,
            "Scoring latency"
        );
    }
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_s: f64,
    pub single_predictions: u64,
    pub high_risk_verdicts: u64,
    pub batches_scored: u64,
    pub batches_rejected: u64,
    pub rows_scored: u64,
    pub bucket_totals: BucketCounts,
    pub processing: ProcessingStats,
}

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<DashboardMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<DashboardMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
