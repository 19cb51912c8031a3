//! HTTP route handlers for the dashboard.
//!
//! HTML views live at `/`, `/single` and `/batch`; the JSON API lives under `/api/v1/`.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::batch::{BatchReport, UploadedTable};
use crate::error::ChurnError;
use crate::feature_extractor::SIGNAL_COLUMNS;
use crate::metrics::MetricsSnapshot;
use crate::types::customer::CustomerSignals;
use crate::types::prediction::SingleAssessment;
use crate::web::charts;
use crate::web::render::{self, BatchOutcome, SingleOutcome, UploadPreview};
use crate::web::state::SharedState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/single", post(single_handler))
        .route("/batch", post(batch_handler))
        .route("/api/v1/predict", post(api_predict_handler))
        .route("/api/v1/batch", post(api_batch_handler))
        .route("/api/v1/schema", get(schema_handler))
        .route("/api/v1/health", get(health_handler))
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ViewQuery {
    #[serde(default)]
    view: Option<String>,
}

async fn index_handler(Query(query): Query<ViewQuery>) -> Html<String> {
    match query.view.as_deref() {
        Some("batch") => Html(render::batch_page(None, &BatchOutcome::Waiting)),
        _ => Html(render::single_page(
            &CustomerSignals::default(),
            &SingleOutcome::Pending,
        )),
    }
}

// ---------------------------------------------------------------------------
// POST /single
// ---------------------------------------------------------------------------

/// Urlencoded single-customer form; checkboxes are only sent when checked.
#[derive(Debug, Deserialize)]
struct SingleForm {
    tenure: u32,
    monthly_charges: u32,
    service_complexity: u32,
    #[serde(default)]
    is_month_to_month: Option<String>,
    #[serde(default)]
    fiber_internet: Option<String>,
    #[serde(default)]
    no_tech_support: Option<String>,
    #[serde(default)]
    manual_payment: Option<String>,
}

impl From<SingleForm> for CustomerSignals {
    fn from(form: SingleForm) -> Self {
        Self {
            tenure: form.tenure,
            monthly_charges: form.monthly_charges,
            is_month_to_month: form.is_month_to_month.is_some(),
            fiber_internet: form.fiber_internet.is_some(),
            no_tech_support: form.no_tech_support.is_some(),
            manual_payment: form.manual_payment.is_some(),
            service_complexity: form.service_complexity,
        }
    }
}

async fn single_handler(State(state): State<SharedState>, Form(form): Form<SingleForm>) -> Response {
    let signals = CustomerSignals::from(form);
    let start_time = Instant::now();

    let (status, outcome) = match state.engine.predict_single(&signals) {
        Ok(assessment) => match charts::gauge_svg(assessment.gauge_value) {
            Ok(gauge_svg) => {
                state.metrics.record_single(start_time.elapsed(), assessment.verdict);
                (
                    StatusCode::OK,
                    SingleOutcome::Scored {
                        assessment,
                        gauge_svg,
                    },
                )
            }
            Err(e) => {
                error!(error = %e, "Failed to render gauge");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SingleOutcome::Failed(format!("could not render gauge: {}", e)),
                )
            }
        },
        Err(e) => {
            log_scoring_error(&e);
            (status_for(&e), SingleOutcome::Failed(e.to_string()))
        }
    };

    (status, Html(render::single_page(&signals, &outcome))).into_response()
}

// ---------------------------------------------------------------------------
// POST /batch
// ---------------------------------------------------------------------------

struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
}

/// Read the `file` field of a multipart upload
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ChurnError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChurnError::InvalidInput(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ChurnError::InvalidInput(e.to_string()))?;
        return Ok(Upload { file_name, bytes });
    }
    Err(ChurnError::InvalidInput("no file uploaded".to_string()))
}

/// Only `.csv` files are accepted; the content type is not inspected
fn check_extension(file_name: Option<&str>) -> Result<(), ChurnError> {
    match file_name {
        None => Ok(()),
        Some("") => Err(ChurnError::InvalidInput("no file uploaded".to_string())),
        Some(name) if name.to_lowercase().ends_with(".csv") => Ok(()),
        Some(name) => Err(ChurnError::InvalidInput(format!(
            "'{}' is not a .csv file",
            name
        ))),
    }
}

async fn batch_handler(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    let start_time = Instant::now();

    let table = match read_upload(&mut multipart).await.and_then(|upload| {
        check_extension(upload.file_name.as_deref())?;
        UploadedTable::parse(upload.bytes.as_ref())
    }) {
        Ok(table) => table,
        Err(e) => {
            state.metrics.record_rejected();
            log_scoring_error(&e);
            let page = render::batch_page(None, &BatchOutcome::Failed(e.to_string()));
            return (status_for(&e), Html(page)).into_response();
        }
    };

    let headers = table.headers().to_vec();
    let preview = UploadPreview {
        headers: &headers,
        rows: table.head(state.scoring.upload_preview_rows),
    };

    let result = state
        .engine
        .predict_batch(table)
        .and_then(|report| {
            let (pie_svg, download_href) = batch_artifacts(&report)?;
            Ok((report, pie_svg, download_href))
        });

    match result {
        Ok((report, pie_svg, download_href)) => {
            state
                .metrics
                .record_batch(start_time.elapsed(), &report.bucket_counts());
            let outcome = BatchOutcome::Scored {
                report: &report,
                preview_rows: state.scoring.preview_rows,
                pie_svg,
                download_href,
                download_filename: &state.scoring.download_filename,
            };
            Html(render::batch_page(Some(&preview), &outcome)).into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                state.metrics.record_rejected();
            }
            log_scoring_error(&e);
            let page = render::batch_page(Some(&preview), &BatchOutcome::Failed(e.to_string()));
            (status_for(&e), Html(page)).into_response()
        }
    }
}

/// Pie chart and inline download link for a scored batch
fn batch_artifacts(report: &BatchReport) -> Result<(String, String), ChurnError> {
    let pie_svg = charts::risk_pie_svg(&report.bucket_counts())
        .map_err(|e| ChurnError::Export(format!("could not render chart: {}", e)))?;
    let csv = report.to_csv()?;
    let download_href = format!(
        "data:text/csv;charset=utf-8;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(csv)
    );
    Ok((pie_svg, download_href))
}

// ---------------------------------------------------------------------------
// POST /api/v1/predict
// ---------------------------------------------------------------------------

async fn api_predict_handler(
    State(state): State<SharedState>,
    Json(signals): Json<CustomerSignals>,
) -> Result<Json<SingleAssessment>, AppError> {
    let start_time = Instant::now();
    let assessment = state.engine.predict_single(&signals).map_err(|e| {
        log_scoring_error(&e);
        AppError::from(e)
    })?;
    state
        .metrics
        .record_single(start_time.elapsed(), assessment.verdict);
    Ok(Json(assessment))
}

// ---------------------------------------------------------------------------
// POST /api/v1/batch
// ---------------------------------------------------------------------------

/// CSV in, scored CSV attachment out
async fn api_batch_handler(State(state): State<SharedState>, body: Bytes) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let scored = UploadedTable::parse(body.as_ref())
        .and_then(|table| state.engine.predict_batch(table))
        .and_then(|report| Ok((report.to_csv()?, report)));

    let (csv, report) = match scored {
        Ok(scored) => scored,
        Err(e) => {
            if e.is_client_error() {
                state.metrics.record_rejected();
            }
            log_scoring_error(&e);
            return Err(e.into());
        }
    };

    state
        .metrics
        .record_batch(start_time.elapsed(), &report.bucket_counts());
    info!(batch_id = %report.batch_id, bytes = csv.len(), "Serving scored CSV");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", state.scoring.download_filename),
            ),
        ],
        csv,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// GET /api/v1/schema
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SchemaResponse {
    features: Vec<String>,
    single_customer_columns: Vec<&'static str>,
}

async fn schema_handler(State(state): State<SharedState>) -> Json<SchemaResponse> {
    Json(SchemaResponse {
        features: state.engine.schema().names().to_vec(),
        single_customer_columns: SIGNAL_COLUMNS.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    features: usize,
    metrics: MetricsSnapshot,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.engine.model_name().to_string(),
        features: state.engine.schema().len(),
        metrics: state.metrics.snapshot(),
    })
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn status_for(err: &ChurnError) -> StatusCode {
    match err {
        ChurnError::MissingColumns { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ChurnError::Parse(_) | ChurnError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ChurnError::Artifact(_) | ChurnError::Inference(_) | ChurnError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn log_scoring_error(err: &ChurnError) {
    if err.is_client_error() {
        warn!(error = %err, "Request rejected");
    } else {
        error!(error = %err, "Scoring failed");
    }
}

/// Structured JSON error response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
    missing_columns: Vec<String>,
}

impl From<ChurnError> for AppError {
    fn from(err: ChurnError) -> Self {
        let status = status_for(&err);
        let message = err.to_string();
        let missing_columns = match err {
            ChurnError::MissingColumns { missing } => missing,
            _ => Vec::new(),
        };
        Self {
            status,
            message,
            missing_columns,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = if self.missing_columns.is_empty() {
            serde_json::json!({ "error": self.message })
        } else {
            serde_json::json!({
                "error": self.message,
                "missing_columns": self.missing_columns,
            })
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_extension() {
        assert!(check_extension(Some("customers.csv")).is_ok());
        assert!(check_extension(Some("CUSTOMERS.CSV")).is_ok());
        assert!(check_extension(None).is_ok());
        assert!(check_extension(Some("")).is_err());
        assert!(matches!(
            check_extension(Some("customers.xlsx")),
            Err(ChurnError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_form_checkboxes() {
        let form = SingleForm {
            tenure: 5,
            monthly_charges: 99,
            service_complexity: 1,
            is_month_to_month: Some("on".to_string()),
            fiber_internet: None,
            no_tech_support: Some("on".to_string()),
            manual_payment: None,
        };
        let signals = CustomerSignals::from(form);
        assert!(signals.is_month_to_month);
        assert!(!signals.fiber_internet);
        assert!(signals.no_tech_support);
        assert!(!signals.manual_payment);
    }

    #[test]
    fn test_status_mapping() {
        let missing = ChurnError::MissingColumns {
            missing: vec!["tenure".to_string()],
        };
        assert_eq!(status_for(&missing), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&ChurnError::Parse("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ChurnError::Inference("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let app_error = AppError::from(missing);
        assert_eq!(app_error.missing_columns, vec!["tenure".to_string()]);
    }
}
