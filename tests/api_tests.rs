/// HTTP API tests driving the router in-process
/// Uses the in-memory store and the fallback classifier, so no network or database is needed
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lead_qualifier::api::handlers::{router, AppState, MAX_UPLOAD_BYTES};
use lead_qualifier::config::Config;
use lead_qualifier::core::intent::FallbackClassifier;
use lead_qualifier::core::scoring::ScoringEngine;
use lead_qualifier::data::memory_storage::InMemoryStorage;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "lead-qualifier-test-boundary";

const LEADS_CSV: &str = "name,role,company,industry,location,linkedin_bio
Ava Patel,VP of Sales,FlowMetrics,SaaS,Berlin,Scaling outbound teams
Sam Lee,Analyst,Acme Retail,Retail,Austin,
,CTO,Globex,Software,,
,,,,,
";

fn app() -> Router {
    let storage = Arc::new(InMemoryStorage::new());
    let engine = ScoringEngine::new(storage.clone(), Arc::new(FallbackClassifier));
    router(Arc::new(AppState::new(Config::default(), storage, engine)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload_request(file_name: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/leads/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn create_offer(app: &Router) -> i64 {
    let (status, body) = send_json(
        app,
        json_request(
            "POST",
            "/offer",
            json!({
                "name": "AI Outreach Automation",
                "value_props": ["24/7 outreach", "6x more meetings"],
                "ideal_use_cases": ["B2B SaaS mid-market"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn upload(app: &Router) -> String {
    let (status, body) = send_json(app, upload_request("leads.csv", LEADS_CSV)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["batch_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_status_and_health() {
    let app = app();

    let (status, body) = send_json(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["endpoints"]["POST /score"].is_string());

    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "lead-qualifier");
}

#[tokio::test]
async fn test_create_offer_validates_payload() {
    let app = app();

    let (status, body) = send_json(
        &app,
        json_request(
            "POST",
            "/offer",
            json!({"name": "Offer", "value_props": "fast", "ideal_use_cases": []}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0], "value_props must be a list");

    let id = create_offer(&app).await;
    assert_eq!(id, 1);
}

#[tokio::test]
async fn test_upload_reports_batch_and_warnings() {
    let app = app();

    let (status, body) = send_json(&app, upload_request("leads.csv", LEADS_CSV)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["leads_created"], 2);
    assert_eq!(body["message"], "Successfully uploaded 2 leads");
    assert!(body["batch_id"].as_str().unwrap().starts_with("batch_"));
    assert_eq!(body["warnings"], json!(["Row 4: Name is required"]));
}

#[tokio::test]
async fn test_upload_rejects_bad_files() {
    let app = app();

    let (status, body) = send_json(&app, upload_request("leads.txt", LEADS_CSV)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File must be a CSV file");

    let (status, body) =
        send_json(&app, upload_request("leads.csv", "name,role\nAva,CEO\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Missing required CSV columns"));

    let (status, body) = send_json(
        &app,
        upload_request(
            "leads.csv",
            "name,role,company,industry,location,linkedin_bio\n,,Globex,,,\n",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid leads found in CSV");
    assert_eq!(body["details"], json!(["Row 2: Name is required"]));
}

/// A one-lead CSV padded through its bio column to exactly `len` bytes.
fn csv_of_size(len: usize) -> String {
    let prefix = "name,role,company,industry,location,linkedin_bio\nAva,CEO,Acme,SaaS,Berlin,";
    let padding = len - prefix.len() - 1;
    format!("{prefix}{}\n", "x".repeat(padding))
}

#[tokio::test]
async fn test_upload_size_limit_applies_to_the_file() {
    let app = app();

    let (status, body) =
        send_json(&app, upload_request("leads.csv", &csv_of_size(MAX_UPLOAD_BYTES))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["leads_created"], 1);

    let (status, body) = send_json(
        &app,
        upload_request("leads.csv", &csv_of_size(MAX_UPLOAD_BYTES + 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File size cannot exceed 10MB");
}

#[tokio::test]
async fn test_score_not_found_cases() {
    let app = app();

    let (status, body) =
        send_json(&app, json_request("POST", "/score", json!({"offer_id": 42}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Offer with id 42 not found");

    let offer_id = create_offer(&app).await;
    let (status, body) =
        send_json(&app, json_request("POST", "/score", json!({"offer_id": offer_id}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No leads found to score");

    let (status, body) = send_json(
        &app,
        json_request(
            "POST",
            "/score",
            json!({"offer_id": offer_id, "batch_id": "batch_missing"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No leads found for batch_id: batch_missing");

    let (status, _) =
        send_json(&app, json_request("POST", "/score", json!({"batch_id": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_flow_score_list_and_export() {
    let app = app();
    let offer_id = create_offer(&app).await;
    let batch_id = upload(&app).await;

    let (status, body) = send_json(
        &app,
        json_request(
            "POST",
            "/score",
            json!({"offer_id": offer_id, "batch_id": batch_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_leads"], 2);
    assert_eq!(body["scored_leads"], 2);
    assert_eq!(body["batch_id"], batch_id.as_str());
    assert!(body.get("errors").is_none());

    let (status, body) = send_json(&app, get("/results")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    // Ava: role 20 + industry 20 + complete 10 + fallback 45.
    assert_eq!(rows[0]["name"], "Ava Patel");
    assert_eq!(rows[0]["score"], 95);
    assert_eq!(rows[0]["intent"], "High");
    assert!(rows[0]["reasoning"]
        .as_str()
        .unwrap()
        .starts_with("Fits decision maker role, exact ICP match, complete data profile."));
    assert_eq!(rows[1]["name"], "Sam Lee");

    let (_, body) = send_json(&app, get("/results?intent=High")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    let (_, body) = send_json(&app, get("/results?intent=high")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    let (_, body) = send_json(&app, get(&format!("/results?offer_id={}", offer_id + 1))).await;
    assert!(body.as_array().unwrap().is_empty());

    let response = app.clone().oneshot(get("/results/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"lead_scores.csv\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Name,Role,Company,Industry,Location,Intent,Score,Rule Score,AI Score,Reasoning")
    );
    assert!(lines
        .next()
        .unwrap()
        .starts_with("Ava Patel,VP of Sales,FlowMetrics,SaaS,Berlin,High,95,50,45,"));
    assert_eq!(text.lines().count(), 3);
}
