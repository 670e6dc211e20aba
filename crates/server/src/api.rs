//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use renewal_lib::{
    health::HealthRegistry,
    observability::{ServiceMetrics, StructuredLogger},
    ComponentStatus, PolicyAttributes, PredictError, PredictionDispatcher, PredictionResult,
    ValidationError,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

pub const ROOT_MESSAGE: &str = "Insurance Policy Renewal Prediction API";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<PredictionDispatcher>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<PredictionDispatcher>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            dispatcher,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Errors surfaced to API callers as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictError),

    #[error("Prediction error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(rejection) => rejection.status(),
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Prediction(PredictError::ModelUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Prediction(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Service banner
async fn root() -> impl IntoResponse {
    Json(json!({ "message": ROOT_MESSAGE }))
}

/// Run a renewal prediction
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PolicyAttributes>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let attrs = match payload {
        Ok(Json(attrs)) => attrs,
        Err(rejection) => return Err(reject(&state, rejection.into())),
    };
    if let Err(e) = attrs.validate() {
        return Err(reject(&state, e.into()));
    }

    let model = attrs.model_choice;
    let dispatcher = state.dispatcher.clone();
    let start = Instant::now();

    // tract inference is synchronous and CPU-bound
    let outcome = tokio::task::spawn_blocking(move || dispatcher.predict(&attrs))
        .await
        .map_err(|e| ApiError::Internal(format!("{} model panicked: {}", model, e)));
    let elapsed = start.elapsed().as_secs_f64();

    let failure = match outcome {
        Ok(Ok(result)) => {
            state.metrics.observe_prediction_latency(model, elapsed);
            state.metrics.inc_predictions(model, result.label);
            state.health_registry.record_success(model).await;
            state.logger.log_prediction(&result, elapsed);
            return Ok(Json(result));
        }
        Ok(Err(e)) => ApiError::from(e),
        Err(e) => e,
    };

    let message = failure.to_string();
    state.metrics.inc_prediction_errors(model);
    state.health_registry.record_failure(model, message.as_str()).await;
    state.logger.log_prediction_failure(model, &message);
    Err(failure)
}

fn reject(state: &AppState, error: ApiError) -> ApiError {
    state.metrics.inc_validation_errors();
    state.logger.log_rejected_request(&error.to_string());
    error
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
