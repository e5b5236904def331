//! HTTP surface: upload form, multipart and JSON analysis endpoints

pub mod page;
pub mod request;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use image::DynamicImage;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::analysis::{decode_image, AnalysisOutcome, AnalysisResponse, ImageAnalyzer};
use crate::caption::Captioner;
use crate::error::AnalysisError;

pub use request::AnalyzeImageRequest;

/// Multipart field carrying the uploaded image
pub const IMAGE_FIELD: &str = "image";

pub type SharedAnalyzer = Arc<ImageAnalyzer<Arc<dyn Captioner>>>;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: SharedAnalyzer,
}

impl AppState {
    pub fn new(analyzer: SharedAnalyzer) -> Self {
        Self { analyzer }
    }
}

pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/analyze", post(analyze_upload))
        .route("/api/analyze", post(analyze_json))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Decode and analyze off the async runtime.
async fn run_analysis<F>(analyzer: SharedAnalyzer, load: F) -> AnalysisOutcome
where
    F: FnOnce() -> Result<Option<DynamicImage>, AnalysisError> + Send + 'static,
{
    let start = Instant::now();
    let task = tokio::task::spawn_blocking(move || match load() {
        Ok(image) => analyzer.analyze(image.as_ref()),
        Err(e) => {
            warn!("Could not decode uploaded image: {}", e);
            AnalysisOutcome::from_error(&e)
        }
    });

    let outcome = match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Analysis task failed: {}", e);
            AnalysisOutcome::from_error(&AnalysisError::Join(e.to_string()))
        }
    };
    info!(
        "Request handled in {} ms (success: {})",
        start.elapsed().as_millis(),
        outcome.is_success()
    );
    outcome
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Option<Bytes>, AnalysisError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AnalysisError::Decode(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AnalysisError::Decode(e.to_string()))?;
        return Ok(Some(data).filter(|d| !d.is_empty()));
    }
    Ok(None)
}

/// POST /analyze - multipart upload from the browser form
async fn analyze_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Json<AnalysisResponse> {
    let data = match read_image_field(&mut multipart).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Malformed upload: {}", e);
            return Json(AnalysisOutcome::from_error(&e).into());
        }
    };

    let outcome = run_analysis(state.analyzer.clone(), move || {
        data.map(|bytes| decode_image(&bytes)).transpose()
    })
    .await;
    Json(outcome.into())
}

/// POST /api/analyze - base64 image in a JSON body
async fn analyze_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeImageRequest>, JsonRejection>,
) -> Json<AnalysisResponse> {
    // malformed bodies get the same error record as an undecodable image
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Malformed JSON request: {}", rejection);
            let e = AnalysisError::Decode(rejection.body_text());
            return Json(AnalysisOutcome::from_error(&e).into());
        }
    };

    let outcome = run_analysis(state.analyzer.clone(), move || request.decode()).await;
    Json(outcome.into())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.analyzer.model_info().model_name.as_str(),
    }))
}
