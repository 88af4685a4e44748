//! Title Extractor - OCR field extraction server for vehicle titles.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use title_extractor::config::PipelineConfig;
use title_extractor::ocr::sidecar::SidecarEngine;
use title_extractor::ocr::tesseract::TesseractCliEngine;
use title_extractor::ocr::{EngineKind, PageImage, PassConfig, RecognitionEngine};
use title_extractor::{ExtractionResult, TitlePipeline};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<TitlePipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "title_extractor=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env()?;
    let aliases = config.make_aliases()?;
    info!(
        "Loaded {} passes and {} canonical makes",
        config.passes.len(),
        aliases.canonical_names().len()
    );

    let engine = engine_from_env()?;
    info!("Recognition engine: {}", engine.name());

    let state = AppState {
        pipeline: Arc::new(TitlePipeline::new(engine, &config, Arc::new(aliases))),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/config/passes", get(list_passes))
        .route("/makes", get(list_makes))
        .route("/extract", post(extract_image))
        .route("/extract/text", post(extract_text))
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024)) // 25MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the backend named by `OCR_ENGINE` (default: sidecar).
fn engine_from_env() -> anyhow::Result<Arc<dyn RecognitionEngine>> {
    let name = std::env::var("OCR_ENGINE").unwrap_or_else(|_| "sidecar".to_string());
    let kind = EngineKind::parse(&name).ok_or_else(|| {
        anyhow::anyhow!("Unknown OCR_ENGINE: {} (expected sidecar or tesseract)", name)
    })?;

    let engine: Arc<dyn RecognitionEngine> = match kind {
        EngineKind::Sidecar => Arc::new(SidecarEngine::from_env(reqwest::Client::new())),
        EngineKind::Tesseract => Arc::new(TesseractCliEngine::from_env()),
    };
    Ok(engine)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List the configured recognition passes.
async fn list_passes(State(state): State<AppState>) -> Json<Vec<PassConfig>> {
    Json(state.pipeline.orchestrator().passes().to_vec())
}

/// List canonical make names known to the alias table.
async fn list_makes(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.pipeline.aliases().canonical_names())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionResponse {
    result: ExtractionResult,
    selected_pass: Option<String>,
    selected_score: Option<u32>,
    selected_text: Option<String>,
    passes_succeeded: usize,
}

/// Upload a page image and extract vehicle fields from it.
async fn extract_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionResponse>, (StatusCode, String)> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e))
    })? {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("page").to_string();
            file_data = field.bytes().await.map_err(|e| {
                (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e))
            })?.to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received image: {} ({} bytes)", filename, file_data.len());

    let image = PageImage::from_bytes(filename, file_data).map_err(|e| {
        warn!("Rejected upload: {}", e);
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let outcome = state.pipeline.extract_image(&image).await;
    let (selected_score, selected_text) = match outcome.selected {
        Some(best) => (Some(best.score), Some(best.text)),
        None => (None, None),
    };

    Ok(Json(ExtractionResponse {
        result: outcome.result,
        selected_pass: outcome.selected_pass,
        selected_score,
        selected_text,
        passes_succeeded: outcome.passes_succeeded,
    }))
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

/// Extract vehicle fields from already recognized text.
async fn extract_text(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Json<ExtractionResult> {
    Json(state.pipeline.extract_text(&request.text))
}
