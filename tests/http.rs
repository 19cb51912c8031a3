//! Integration tests for the HTTP dashboard and JSON API

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::Engine;
use churniq::config::ScoringConfig;
use churniq::metrics::DashboardMetrics;
use churniq::models::{InferenceEngine, LinearClassifier};
use churniq::types::FeatureSchema;
use churniq::web::{self, AppState};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

const COLUMNS: [&str; 8] = [
    "tenure",
    "MonthlyCharges",
    "TotalCharges",
    "is_month_to_month",
    "fiber_risk_flag",
    "support_gap",
    "manual_payment_flag",
    "service_complexity_score",
];

const BOUNDARY: &str = "churniq-test-boundary";

fn test_app() -> (Router, Arc<DashboardMetrics>) {
    let schema = Arc::new(
        FeatureSchema::new(COLUMNS.iter().map(|c| c.to_string()).collect()).unwrap(),
    );
    let coefficients: BTreeMap<String, f64> = [
        ("tenure", -0.04),
        ("MonthlyCharges", 0.012),
        ("is_month_to_month", 1.1),
        ("fiber_risk_flag", 0.6),
        ("support_gap", 0.5),
        ("manual_payment_flag", 0.4),
        ("service_complexity_score", -0.15),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let classifier = LinearClassifier::new("test_model", -1.2, &coefficients, &schema).unwrap();

    let scoring = ScoringConfig::default();
    let engine = InferenceEngine::from_parts(Box::new(classifier), schema, &scoring).unwrap();
    let metrics = Arc::new(DashboardMetrics::new());
    let state = Arc::new(AppState::new(engine, metrics.clone(), scoring));
    (web::app(state, None), metrics)
}

fn full_csv() -> String {
    format!(
        "customerID,{}\n0001-A,60,30,1800,0,0,0,0,5\n0002-B,1,110,110,1,1,1,1,0\n",
        COLUMNS.join(",")
    )
}

fn multipart_body(file_name: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = file_name,
        c = content
    )
}

fn multipart_request(file_name: &str, content: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/batch")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, content)))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_index_renders_both_views() {
    let (app, _) = test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("ChurnIQ"));
    assert!(html.contains("action=\"/single\""));

    let response = app
        .oneshot(Request::builder().uri("/?view=batch").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let html = body_string(response).await;
    assert!(html.contains("multipart/form-data"));
}

#[tokio::test]
async fn test_single_form_scores_customer() {
    let (app, metrics) = test_app();

    let form = "tenure=1&monthly_charges=110&service_complexity=0\
                &is_month_to_month=on&fiber_internet=on&no_tech_support=on&manual_payment=on";
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/single")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("High churn risk"));
    assert!(html.contains("<svg"));
    assert_eq!(metrics.snapshot().high_risk_verdicts, 1);
}

#[tokio::test]
async fn test_batch_upload_offers_download() {
    let (app, metrics) = test_app();

    let response = app
        .oneshot(multipart_request("customers.csv", &full_csv()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("churn_predictions.csv"));
    assert!(html.contains("High Risk"));

    // the inline download holds the full scored table
    let prefix = "data:text/csv;charset=utf-8;base64,";
    let start = html.find(prefix).unwrap() + prefix.len();
    let end = start + html[start..].find('"').unwrap();
    let csv = base64::engine::general_purpose::STANDARD
        .decode(&html[start..end])
        .unwrap();
    let csv = String::from_utf8(csv).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        format!("customerID,{},churn_probability,risk_bucket", COLUMNS.join(","))
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("0001-A,"));
    assert!(rows[1].ends_with(",High Risk"));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches_scored, 1);
    assert_eq!(snapshot.rows_scored, 2);
}

#[tokio::test]
async fn test_batch_upload_missing_columns() {
    let (app, metrics) = test_app();

    let csv = "customerID,tenure,MonthlyCharges\n0001-A,10,80\n";
    let response = app.oneshot(multipart_request("customers.csv", csv)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_string(response).await;
    assert!(html.contains("Missing required columns"));
    assert!(html.contains("support_gap"));
    assert!(!html.contains("data:text/csv"));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches_rejected, 1);
    assert_eq!(snapshot.batches_scored, 0);
}

#[tokio::test]
async fn test_batch_upload_rejects_other_extensions() {
    let (app, _) = test_app();

    let response = app
        .oneshot(multipart_request("customers.xlsx", &full_csv()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_predict() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"tenure": 60, "monthly_charges": 30}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["verdict"], "stable");
    let probability = json["churn_probability"].as_f64().unwrap();
    assert!((0.0..0.4).contains(&probability));
}

#[tokio::test]
async fn test_api_predict_out_of_range() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"tenure": 500}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_batch_returns_csv_attachment() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/batch")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from(full_csv()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"churn_predictions.csv\"");

    let csv = body_string(response).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        format!("customerID,{},churn_probability,risk_bucket", COLUMNS.join(","))
    );
    assert_eq!(lines.count(), 2);
}

#[tokio::test]
async fn test_api_batch_missing_columns_json() {
    let (app, _) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/batch")
                .body(Body::from("tenure,MonthlyCharges\n1,2\n"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    let missing: Vec<&str> = json["missing_columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        missing,
        vec![
            "TotalCharges",
            "is_month_to_month",
            "fiber_risk_flag",
            "support_gap",
            "manual_payment_flag",
            "service_complexity_score",
        ]
    );
}

#[tokio::test]
async fn test_schema_and_health() {
    let (app, _) = test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/v1/schema").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["features"].as_array().unwrap().len(), COLUMNS.len());
    assert_eq!(json["single_customer_columns"].as_array().unwrap().len(), 7);

    let response = app
        .oneshot(Request::builder().uri("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model"], "test_model");
    assert_eq!(json["features"], 8);
}
