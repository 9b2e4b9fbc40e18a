//! HTTP endpoints under `/api/v1` plus the `/ws/midi` relay.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use theory_engine::{BasicStats, ChordResult, NoteInput, ScoreReport, ScoreRequest, TheoryEngine};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::relay::{self, Relay};

/// Messages buffered per relay subscriber before it starts dropping.
const RELAY_CAPACITY: usize = 256;

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TheoryEngine>,
    pub relay: Relay,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(engine: Arc<TheoryEngine>, max_upload_bytes: usize) -> Self {
        Self {
            engine,
            relay: Relay::new(RELAY_CAPACITY),
            max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/analyze/chord", post(analyze_chord))
        .route("/upload", post(upload))
        .route("/analyze", post(reanalyze));

    Router::new()
        .nest("/api/v1", api)
        .route("/ws/midi", get(relay::midi_socket))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Errors surfaced to HTTP clients as `{"detail": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("malformed form data: {0}")]
    Form(#[from] MultipartError),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Form(e) => e.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "system": "MIDI-Navigate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChordRequest {
    pub notes: Vec<NoteInput>,
    #[serde(default = "ChordRequest::default_detect_type")]
    pub detect_type: String,
}

impl ChordRequest {
    fn default_detect_type() -> String {
        "standard".to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct ChordResponse {
    pub chord: ChordResult,
    /// Unix seconds.
    pub timestamp: f64,
}

async fn analyze_chord(
    State(state): State<AppState>,
    Json(request): Json<ChordRequest>,
) -> Json<ChordResponse> {
    debug!(
        notes = request.notes.len(),
        detect_type = %request.detect_type,
        "chord request"
    );
    let chord = state.engine.resolve_chord(&request.notes);

    Json(ChordResponse {
        chord,
        timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
    })
}

/// Fields of an upload form; everything but the file is optional here.
#[derive(Debug, Default)]
struct ScoreForm {
    filename: Option<String>,
    bytes: Option<Vec<u8>>,
    track_indices: Option<String>,
    complexity: Option<String>,
    window_size: Option<f64>,
}

impl ScoreForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = ScoreForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    form.filename = field.file_name().map(str::to_string);
                    form.bytes = Some(field.bytes().await?.to_vec());
                }
                "track_indices" => form.track_indices = Some(field.text().await?),
                "complexity" => form.complexity = Some(field.text().await?),
                "window_size" => {
                    let text = field.text().await?;
                    let value = text.trim().parse().map_err(|_| {
                        ApiError::BadRequest(format!("window_size must be a number, got {text:?}"))
                    })?;
                    form.window_size = Some(value);
                }
                other => debug!(field = other, "ignoring form field"),
            }
        }

        Ok(form)
    }

    /// The uploaded MIDI bytes and file name; rejects other extensions.
    fn midi_file(&mut self) -> Result<(String, Vec<u8>), ApiError> {
        let bytes = self
            .bytes
            .take()
            .ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
        let filename = self.filename.take().unwrap_or_default();

        let lower = filename.to_lowercase();
        if !(lower.ends_with(".mid") || lower.ends_with(".midi")) {
            return Err(ApiError::BadRequest("Invalid file format.".to_string()));
        }
        Ok((filename, bytes))
    }

    fn request(&self, track_selection: Option<Vec<usize>>) -> ScoreRequest {
        let defaults = ScoreRequest::default();
        ScoreRequest {
            track_selection,
            complexity: self.complexity.clone().unwrap_or(defaults.complexity),
            window_size: self.window_size.unwrap_or(defaults.window_size),
        }
    }
}

/// Run the CPU-bound score analysis off the async workers.
async fn analyze_blocking(
    engine: Arc<TheoryEngine>,
    bytes: Vec<u8>,
    request: ScoreRequest,
) -> Result<ScoreReport, ApiError> {
    tokio::task::spawn_blocking(move || engine.analyze_key(&bytes, &request))
        .await
        .map_err(|e| ApiError::Internal(format!("analysis task failed: {e}")))?
        .map_err(|e| ApiError::BadRequest(format!("MIDI file corrupted or non-standard: {e}")))
}

#[derive(Debug, Serialize)]
pub struct FileAnalysisResponse {
    pub filename: String,
    pub basic_stats: BasicStats,
    pub music_theory: ScoreReport,
    pub message: String,
}

async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FileAnalysisResponse>, ApiError> {
    let mut form = ScoreForm::read(multipart).await?;
    let (filename, bytes) = form.midi_file()?;
    let request = form.request(None);

    info!(%filename, bytes = bytes.len(), "analyzing upload");
    let report = analyze_blocking(Arc::clone(&state.engine), bytes, request).await?;

    Ok(Json(FileAnalysisResponse {
        filename,
        basic_stats: report.basic_stats.clone(),
        music_theory: report,
        message: "Analysis complete.".to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ReanalysisResponse {
    pub music_theory: ScoreReport,
    pub message: String,
}

async fn reanalyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ReanalysisResponse>, ApiError> {
    let mut form = ScoreForm::read(multipart).await?;

    let raw = form
        .track_indices
        .clone()
        .ok_or_else(|| ApiError::BadRequest("missing track_indices field".to_string()))?;
    let indices: Vec<usize> = serde_json::from_str(&raw).map_err(|e| {
        ApiError::BadRequest(format!("track_indices must be a JSON array of integers: {e}"))
    })?;

    let bytes = form
        .bytes
        .take()
        .ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
    let request = form.request(Some(indices));

    info!(
        tracks = ?request.track_selection,
        complexity = %request.complexity,
        window_size = request.window_size,
        "re-analyzing"
    );
    let report = analyze_blocking(Arc::clone(&state.engine), bytes, request).await?;

    Ok(Json(ReanalysisResponse {
        music_theory: report,
        message: "Re-analysis complete.".to_string(),
    }))
}
