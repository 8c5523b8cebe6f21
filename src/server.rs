use crate::analyzer::ReportAnalyzer;
use crate::config::Config;
use crate::engines;
use crate::error::LabError;
use crate::extraction::LabTestRecord;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when no tesseract executable was found at startup
    pub analyzer: Option<Arc<ReportAnalyzer>>,
    pub config: Arc<Config>,
}

/// Lab test extraction response
#[derive(Serialize)]
pub struct LabTestsResponse {
    pub is_success: bool,
    pub data: Vec<LabTestRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tesseract_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let analyzer =
        engines::build_engine(&config).map(|engine| Arc::new(ReportAnalyzer::new(engine)));
    if analyzer.is_none() {
        tracing::error!("Tesseract not found; /get-lab-tests will reject every request");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        analyzer,
        config: Arc::new(config),
    };

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all routes and layers
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/get-lab-tests", post(handle_get_lab_tests))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle lab report uploads
async fn handle_get_lab_tests(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<LabTestsResponse>, LabError> {
    // Engine availability is checked before the body is read
    let analyzer = state.analyzer.clone().ok_or(LabError::EngineUnavailable)?;
    let mut multipart = multipart.map_err(|e| LabError::InvalidRequest(e.body_text()))?;
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LabError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        content_type = field.content_type().map(|s| s.to_string());
        file_data = Some(field.bytes().await.map_err(|e| {
            LabError::InvalidRequest(format!("Failed to read file data: {}", e))
        })?);
    }

    let data = file_data.ok_or(LabError::MissingFile)?;

    let is_image = content_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("image/"));
    if !is_image {
        tracing::warn!("Rejected upload with content type: {:?}", content_type);
        return Err(LabError::NotAnImage);
    }

    let engine_name = analyzer.engine_name();
    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze_bytes(&data))
        .await
        .map_err(|e| LabError::Internal(format!("Analysis task failed: {}", e)))??;

    tracing::info!(
        "Lab report processed by {} in {}ms ({} chars, {} tests, preprocessing {}ms)",
        engine_name,
        start.elapsed().as_millis(),
        analysis.text_len,
        analysis.records.len(),
        analysis.preprocessing_ms
    );
    tracing::debug!("Preprocessing steps: {:?}", analysis.steps);

    if analysis.records.is_empty() {
        tracing::warn!("No lab data found in the image");
        return Ok(Json(LabTestsResponse {
            is_success: true,
            data: Vec::new(),
            message: Some("No lab test data found in the image".to_string()),
        }));
    }

    Ok(Json(LabTestsResponse {
        is_success: true,
        data: analysis.records,
        message: None,
    }))
}

/// Handle health check requests
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let response = match &state.config.tesseract_cmd {
        Some(path) if state.analyzer.is_some() => HealthResponse {
            status: "healthy".to_string(),
            tesseract_path: Some(path.display().to_string()),
            error: None,
        },
        _ => HealthResponse {
            status: "unhealthy".to_string(),
            tesseract_path: None,
            error: Some("Tesseract OCR not found".to_string()),
        },
    };

    Json(response)
}
