//! Shared application state for the dashboard server.

use crate::config::ScoringConfig;
use crate::metrics::DashboardMetrics;
use crate::models::inference::InferenceEngine;
use std::sync::Arc;

/// State available to all request handlers.
///
/// Everything here is built before the server starts and only read afterwards.
pub struct AppState {
    pub engine: InferenceEngine,
    pub metrics: Arc<DashboardMetrics>,
    pub scoring: ScoringConfig,
}

impl AppState {
    pub fn new(engine: InferenceEngine, metrics: Arc<DashboardMetrics>, scoring: ScoringConfig) -> Self {
        Self {
            engine,
            metrics,
            scoring,
        }
    }
}

/// Type alias used in axum handlers.
pub type SharedState = Arc<AppState>;
