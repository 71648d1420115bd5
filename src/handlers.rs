use crate::config::Config;
use crate::errors::AppError;
use crate::ingest::{new_batch_id, parse_leads};
use crate::models::*;
use crate::reporting::{write_results_csv, LeadResult};
use crate::scoring::ScoringEngine;
use crate::storage::Storage;
use axum::{
    extract::{multipart::Multipart, rejection::JsonRejection, DefaultBodyLimit, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted CSV upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// At most this many per-row warnings or per-lead errors are echoed back to the caller.
const MAX_REPORTED_ISSUES: usize = 10;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Offer, lead and score persistence.
    pub storage: Arc<dyn Storage>,
    /// Scoring engine sharing `storage`.
    pub engine: Arc<ScoringEngine>,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn Storage>, engine: ScoringEngine) -> Self {
        Self {
            config,
            storage,
            engine: Arc::new(engine),
        }
    }
}

/// Routes that take caller input. Callers may add rate limiting on top.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/offer", post(create_offer))
        .route("/leads/upload", post(upload_leads))
        .route("/score", post(score_leads))
        .route("/results", get(list_results))
        .route("/results/export", get(export_results))
        .layer(
            ServiceBuilder::new()
                // Request size limit replaces axum's 2MB default for multipart uploads;
                // the file size itself is checked in `upload_leads`
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES,
                )),
        )
}

/// Full application: status routes plus `api`, with tracing and CORS.
pub fn app(state: Arc<AppState>, api: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/", get(api_status))
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Application router without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    app(state, api_routes())
}

/// GET /
///
/// Service status and the list of available endpoints.
pub async fn api_status() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Lead Qualification API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /offer": "Create product/offer",
            "POST /leads/upload": "Upload leads CSV",
            "POST /score": "Score leads",
            "GET /results": "Get scored results",
            "GET /results/export": "Export results as CSV"
        }
    }))
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-qualifier",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /offer
///
/// Stores a product/offer. The payload is validated here so the scoring core only ever sees
/// a non-empty name and string lists.
pub async fn create_offer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Offer>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let new_offer = NewOffer::from_json(&payload)?;

    let offer = state.storage.insert_offer(new_offer).await?;
    tracing::info!("POST /offer - created offer {} ({})", offer.id, offer.name);

    Ok((StatusCode::CREATED, Json(offer)))
}

/// POST /leads/upload
///
/// Accepts a multipart form with a `file` field holding a CSV of leads. All leads of the
/// upload share a freshly generated batch id.
pub async fn upload_leads(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file was submitted".to_string()))?;
    if !file_name.ends_with(".csv") {
        return Err(AppError::BadRequest("File must be a CSV file".to_string()));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(
            "File size cannot exceed 10MB".to_string(),
        ));
    }

    let batch_id = new_batch_id();
    let import = parse_leads(&bytes, &batch_id, state.config.max_leads_per_upload)?;
    let stored = state.storage.insert_leads(import.leads).await?;

    tracing::info!(
        "POST /leads/upload - {} leads stored in {} ({} warnings)",
        stored.len(),
        batch_id,
        import.warnings.len()
    );

    let mut warnings = import.warnings;
    warnings.truncate(MAX_REPORTED_ISSUES);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: format!("Successfully uploaded {} leads", stored.len()),
            batch_id,
            leads_created: stored.len(),
            warnings,
        }),
    ))
}

/// POST /score
///
/// Scores the leads of `batch_id` (or every lead when absent) against `offer_id`.
pub async fn score_leads(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let batch_id = request
        .batch_id
        .filter(|batch| !batch.trim().is_empty());
    tracing::info!(
        "POST /score - offer_id: {}, batch_id: {:?}",
        request.offer_id,
        batch_id
    );

    let offer = state
        .storage
        .offer(request.offer_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Offer with id {} not found", request.offer_id))
        })?;

    let leads = match batch_id.as_deref() {
        Some(batch) => {
            let leads = state.storage.leads_by_batch(batch).await?;
            if leads.is_empty() {
                return Err(AppError::NotFound(format!(
                    "No leads found for batch_id: {}",
                    batch
                )));
            }
            leads
        }
        None => {
            let leads = state.storage.all_leads().await?;
            if leads.is_empty() {
                return Err(AppError::NotFound("No leads found to score".to_string()));
            }
            leads
        }
    };

    let outcome = state.engine.score_leads(&leads, &offer).await;
    let errors = outcome
        .skipped
        .iter()
        .take(MAX_REPORTED_ISSUES)
        .map(|skipped| skipped.describe())
        .collect();

    Ok(Json(ScoreResponse {
        message: format!("Successfully scored {} leads", outcome.scored.len()),
        total_leads: leads.len(),
        scored_leads: outcome.scored.len(),
        offer_id: offer.id,
        batch_id,
        errors,
    }))
}

/// GET /results
///
/// Scored leads, highest score first. Supports `offer_id`, `batch_id` and `intent` filters.
pub async fn list_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<LeadResult>>, AppError> {
    let filter = ScoreFilter::from(query);
    let rows = state.storage.scores(&filter).await?;
    tracing::debug!("GET /results - {} rows for {:?}", rows.len(), filter);

    Ok(Json(rows.iter().map(LeadResult::from).collect()))
}

/// GET /results/export
///
/// Same rows as `/results`, as a `lead_scores.csv` attachment.
pub async fn export_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ScoreFilter::from(query);
    let rows = state.storage.scores(&filter).await?;
    let body = write_results_csv(&rows)?;
    tracing::info!("GET /results/export - {} rows", rows.len());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"lead_scores.csv\"",
            ),
        ],
        body,
    ))
}
