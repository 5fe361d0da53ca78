use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use proxi_core::{
    predict_raw, ClassifierConfig, ClassifierState, ProxiError, SharedEngine, Step,
    StreamingClassifier,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::stats::{ServingStats, StatsSnapshot};

pub type StreamSession = StreamingClassifier<SharedEngine>;

/// Shared state for the API. The engine is loaded once and used read-only by
/// every handler; the streaming session is the only mutable piece.
#[derive(Clone)]
pub struct ApiState {
    engine: SharedEngine,
    stream: Arc<Mutex<StreamSession>>,
    stats: Arc<ServingStats>,
    model_window: usize,
    started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(engine: SharedEngine, classifier: ClassifierConfig) -> Result<Self, ProxiError> {
        let model_window = classifier.model_window;
        let stream = StreamingClassifier::new(engine.clone(), classifier)?;
        Ok(Self {
            engine,
            stream: Arc::new(Mutex::new(stream)),
            stats: Arc::new(ServingStats::default()),
            model_window,
            started_at: Utc::now(),
        })
    }
}

// Request/response types
#[derive(Deserialize)]
pub struct PredictRequest {
    inputs: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
pub struct PredictResponse {
    prediction: Vec<f32>,
}

#[derive(Deserialize)]
pub struct IngestRequest {
    values: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
pub struct IngestResponse {
    steps: Vec<Step>,
    #[serde(flatten)]
    state: ClassifierState,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    status: String,
    version: String,
    model: String,
    started_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    error: String,
}

/// Error returned by handlers, rendered as `{"error": ...}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ProxiError> for ApiError {
    fn from(e: ProxiError) -> Self {
        let status = match e {
            ProxiError::Halted { .. } => StatusCode::CONFLICT,
            _ if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl ApiState {
    fn track<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        self.stats.record_request();
        if let Err(e) = &result {
            if e.status.is_client_error() {
                self.stats.record_client_error();
                warn!(status = e.status.as_u16(), error = %e.message, "Rejected request");
            } else {
                self.stats.record_server_error();
                error!(status = e.status.as_u16(), error = %e.message, "Request failed");
            }
        }
        result
    }
}

// Handlers
async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.engine.describe(),
        started_at: state.started_at,
    })
}

async fn get_stats(State(state): State<ApiState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Single raw inference over exactly `model_window` values, no smoothing.
async fn predict(
    State(state): State<ApiState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let result = predict_once(&state, payload);
    state.track(result)
}

fn predict_once(
    state: &ApiState,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    let start = Instant::now();
    let prediction = predict_raw(&state.engine, &request.inputs, state.model_window)?;
    state.stats.record_inference(start.elapsed());
    Ok(Json(PredictResponse { prediction }))
}

/// Feeds a batch of readings through the shared streaming session.
async fn stream_ingest(
    State(state): State<ApiState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let result = ingest_batch(&state, payload).await;
    state.track(result)
}

async fn ingest_batch(
    state: &ApiState,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(request) = payload?;
    // Validate the whole batch first so a bad value ingests nothing
    if let Some(bad) = request.values.iter().find(|v| !v.is_finite()) {
        return Err(ProxiError::InvalidSample(*bad).into());
    }

    let mut stream = state.stream.lock().await;
    let total = request.values.len();
    let mut steps = Vec::with_capacity(total);
    for &value in &request.values {
        let start = Instant::now();
        match stream.ingest(value) {
            Ok(step) => {
                if step.score.is_some() {
                    state.stats.record_inference(start.elapsed());
                }
                steps.push(step);
            }
            Err(e) => {
                state.stats.record_samples(steps.len() as u64);
                let mut err = ApiError::from(e);
                if !steps.is_empty() {
                    err.message = format!(
                        "{} ({} of {} values ingested before the failure)",
                        err.message,
                        steps.len(),
                        total
                    );
                }
                return Err(err);
            }
        }
    }
    state.stats.record_samples(steps.len() as u64);

    Ok(Json(IngestResponse {
        steps,
        state: stream.state(),
    }))
}

async fn stream_state(State(state): State<ApiState>) -> Json<ClassifierState> {
    Json(state.stream.lock().await.state())
}

async fn stream_reset(State(state): State<ApiState>) -> Json<ClassifierState> {
    let mut stream = state.stream.lock().await;
    let before = stream.state();
    stream.reset();
    info!(
        samples_seen = before.samples_seen,
        edge_count = before.edge_count,
        "Streaming session reset"
    );
    Json(stream.state())
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(get_stats))
        .route("/predict/post", post(predict))
        .route("/stream/ingest", post(stream_ingest))
        .route("/stream/state", get(stream_state))
        .route("/stream/reset", post(stream_reset))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn run_api_server(state: ApiState, addr: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
