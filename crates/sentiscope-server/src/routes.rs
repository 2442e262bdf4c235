//! HTTP routes and handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sentiscope_models::{NormalizerMode, SlotStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::ServerConfig;
use crate::orchestrator::{CompareResponse, Orchestrator, PredictionResponse};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Registry-backed request orchestrator
    pub orchestrator: Orchestrator,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/backends", get(backends))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .route("/predict/compare", post(predict_compare))
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Sentiscope sentiment API is running",
        "backends": state.orchestrator.registry().names(),
        "explanation_budget_ms": state.config.explanation_budget_ms,
    }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

#[derive(Debug, Serialize)]
struct BackendsResponse {
    normalizer: NormalizerMode,
    trained: usize,
    backends: Vec<SlotStatus>,
}

async fn backends(State(state): State<AppState>) -> Json<BackendsResponse> {
    let registry = state.orchestrator.registry();
    Json(BackendsResponse {
        normalizer: registry.normalizer_mode(),
        trained: registry.trained_count(),
        backends: registry.status(),
    })
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    text: String,
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    "logistic_regression".to_string()
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    text: String,
}

async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictionResponse>, AppError> {
    let response = state.orchestrator.predict_one(&req.model, &req.text).await?;
    Ok(Json(response))
}

async fn predict_compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, AppError> {
    let response = state.orchestrator.compare(&req.text).await?;
    Ok(Json(response))
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Error handling
#[derive(Debug)]
enum AppError {
    InvalidRequest(String),
    InternalError(String),
}

impl From<sentiscope_core::Error> for AppError {
    fn from(err: sentiscope_core::Error) -> Self {
        if err.is_client_error() {
            AppError::InvalidRequest(err.to_string())
        } else {
            error!("Request failed: {}", err);
            AppError::InternalError(err.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, kind) = match self {
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg, "invalid_request_error")
            }
            AppError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "server_error")
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use sentiscope_models::{ModelRegistry, ModelsConfig};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(dir: &std::path::Path) -> Router {
        let config = ServerConfig {
            models: ModelsConfig::default().with_artifacts_dir(dir),
            ..ServerConfig::default()
        };
        let registry = ModelRegistry::load(config.models.clone()).unwrap();
        let state = AppState {
            orchestrator: Orchestrator::new(Arc::new(registry), Duration::from_secs(5)),
            config: Arc::new(config),
            metrics_handle: PrometheusBuilder::new().build_recorder().handle(),
        };
        create_router(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) =
            send(app(dir.path()), Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backends"].as_array().unwrap().len(), 4);
        assert_eq!(body["explanation_budget_ms"], 2000);

        let response = app(dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_defaults_to_logistic_regression() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            post_json("/predict", json!({"text": "A brilliant, stunning film. Loved it!"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model"], "logistic_regression");
        assert_eq!(body["sentiment"], "positive");
        assert!(body["lime_words"].is_array());
        assert!(body["inference_time_ms"].as_f64().is_some());
    }

    #[tokio::test]
    async fn test_unknown_model_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            post_json("/predict", json!({"text": "great", "model": "svm"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert!(body["error"]["message"].as_str().unwrap().contains("svm"));
    }

    #[tokio::test]
    async fn test_compare_returns_all_backends() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            app(dir.path()),
            post_json("/predict/compare", json!({"text": "Dull and boring."})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_object().unwrap();
        assert_eq!(results.len(), 4);
        for name in ["naive_bayes", "logistic_regression", "rnn_lstm", "distilbert"] {
            assert_eq!(results[name]["model"], name);
        }
    }

    #[tokio::test]
    async fn test_backends_lists_stub_status() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) =
            send(app(dir.path()), Request::get("/backends").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["normalizer"], "degraded");
        assert_eq!(body["trained"], 0);
        let backends = body["backends"].as_array().unwrap();
        assert_eq!(backends.len(), 4);
        assert!(backends.iter().all(|b| b["kind"] == "heuristic_stub"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
