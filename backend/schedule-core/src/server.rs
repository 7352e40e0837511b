// src/server.rs
use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::data_source::{DataAccessError, SnapshotCache};
use crate::schedule_table::{compute_schedule_table, ProcessingError, ScheduleTable};

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<SnapshotCache>,
}

impl AppState {
    pub fn new(cache: SnapshotCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Data loading error: {0}")]
    DataLoad(#[from] DataAccessError),
    #[error("Data processing error: {0}")]
    Processing(#[from] ProcessingError),
    #[error("Unexpected error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
    pub detail: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ApiError::DataLoad(e) => ErrorEnvelope {
                error: "Failed to load data from JSON files",
                detail: e.to_string(),
                code: "DATA_LOAD_ERROR",
            },
            ApiError::Processing(e) => ErrorEnvelope {
                error: "Failed to process schedule data",
                detail: e.to_string(),
                code: "PROCESSING_ERROR",
            },
            // Internal details stay in the logs.
            ApiError::Internal(_) => ErrorEnvelope {
                error: "Internal server error",
                detail: "An unexpected error occurred".to_string(),
                code: "INTERNAL_ERROR",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        error!(code = envelope.code, "{}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
    }
}

/// Builds the router with tracing, panic and optional CORS layers applied.
pub fn build_router(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/schedule-table", get(handle_schedule_table))
        .route("/api/schedule-table/", get(handle_schedule_table))
        .route("/api/schedule-table/csv", get(handle_schedule_table_csv))
        .route("/api/schedule-table/refresh", post(handle_refresh))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if allowed_origins.is_empty() {
        return router;
    }

    info!("CORS enabled for {} origin(s)", allowed_origins.len());
    router.layer(
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
    )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(message).into_response()
}

// Loading reads files, so the whole computation runs off the async workers.
async fn load_table(state: &AppState) -> Result<ScheduleTable, ApiError> {
    let cache = Arc::clone(&state.cache);
    tokio::task::spawn_blocking(move || -> Result<ScheduleTable, ApiError> {
        let snapshot = cache.snapshot()?;
        Ok(compute_schedule_table(snapshot.as_ref())?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Schedule task failed: {}", e)))?
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "data_loaded": state.cache.is_loaded(),
    }))
}

async fn handle_schedule_table(
    State(state): State<AppState>,
) -> Result<Json<ScheduleTable>, ApiError> {
    info!("Processing schedule table request");
    let table = load_table(&state).await?;
    if table.is_empty() {
        info!("No assignments found, returning empty schedule table");
    } else {
        info!(
            "Successfully returned schedule data with {} rows",
            table.rows.len()
        );
    }
    Ok(Json(table))
}

async fn handle_schedule_table_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    info!("Processing schedule table CSV request");
    let table = load_table(&state).await?;

    let mut buffer = Vec::new();
    table
        .write_csv(&mut buffer)
        .map_err(|e| ApiError::Internal(format!("CSV encoding failed: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        buffer,
    )
        .into_response())
}

async fn handle_refresh(State(state): State<AppState>) -> impl IntoResponse {
    info!("Handling schedule data refresh request");
    state.cache.refresh();
    Json(serde_json::json!({ "status": "refreshed" }))
}
