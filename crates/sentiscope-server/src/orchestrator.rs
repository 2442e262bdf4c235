//! Request orchestration: predict, explain within a budget, shape the response

use sentiscope_core::{Error, ExplanationItem, Result, Sentiment};
use sentiscope_models::{BackendName, Dispatcher, Explainer, ModelRegistry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Response for one backend
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub model: BackendName,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub lime_words: Vec<ExplanationItem>,
    /// Wall-clock time of the prediction alone
    pub inference_time_ms: f64,
}

/// Responses for every backend, keyed by name
#[derive(Debug, Clone, Serialize)]
pub struct CompareResponse {
    pub results: BTreeMap<BackendName, PredictionResponse>,

    /// Backends whose prediction failed, with the reason
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<BackendName, String>,
}

/// Composes the registry's entry points per request
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    explanation_budget: Duration,
}

impl Orchestrator {
    pub fn new(registry: Arc<ModelRegistry>, explanation_budget: Duration) -> Self {
        Self {
            registry,
            explanation_budget,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Predict and explain with one backend given by name
    pub async fn predict_one(&self, backend: &str, text: &str) -> Result<PredictionResponse> {
        let name: BackendName = backend.parse()?;
        self.predict(name, Arc::from(text)).await
    }

    /// Every backend on the same text, in registry order.
    ///
    /// A backend that fails is reported under `errors`; the others still answer.
    pub async fn compare(&self, text: &str) -> Result<CompareResponse> {
        let text: Arc<str> = Arc::from(text);
        let mut results = BTreeMap::new();
        let mut errors = BTreeMap::new();
        for name in self.registry.names() {
            match self.predict(name, Arc::clone(&text)).await {
                Ok(response) => {
                    results.insert(name, response);
                }
                Err(e) => {
                    warn!("{} failed during comparison: {}", name, e);
                    metrics::counter!(
                        "sentiscope_prediction_errors_total",
                        "backend" => name.as_str()
                    )
                    .increment(1);
                    errors.insert(name, e.to_string());
                }
            }
        }
        Ok(CompareResponse { results, errors })
    }

    async fn predict(&self, name: BackendName, text: Arc<str>) -> Result<PredictionResponse> {
        let registry = Arc::clone(&self.registry);
        let input = Arc::clone(&text);
        let (result, elapsed) = tokio::task::spawn_blocking(move || {
            let slot = registry
                .get(name)
                .ok_or_else(|| Error::inference(format!("registry has no slot for {}", name)))?;
            let started = Instant::now();
            let result = Dispatcher::from_registry(&registry).predict(slot, &input)?;
            Ok::<_, Error>((result, started.elapsed()))
        })
        .await
        .map_err(|e| Error::inference(format!("prediction task failed: {}", e)))??;

        metrics::counter!("sentiscope_predictions_total", "backend" => name.as_str()).increment(1);
        metrics::histogram!("sentiscope_inference_latency_us", "backend" => name.as_str())
            .record(elapsed.as_micros() as f64);
        debug!(
            "{} predicted {} ({:.4}) in {:?}",
            name, result.label, result.confidence, elapsed
        );

        let lime_words = self.explain(name, text).await;

        Ok(PredictionResponse {
            model: name,
            sentiment: result.label,
            confidence: result.confidence,
            lime_words,
            inference_time_ms: elapsed.as_secs_f64() * 1000.0,
        })
    }

    /// Explanation under the budget; an overrun or a failed task yields no words
    async fn explain(&self, name: BackendName, text: Arc<str>) -> Vec<ExplanationItem> {
        let registry = Arc::clone(&self.registry);
        let num_features = registry.config().explanation.num_features;
        let task = tokio::task::spawn_blocking(move || {
            let slot = registry.get(name)?;
            Some(Explainer::from_registry(&registry).explain_detailed(slot, &text, num_features))
        });

        match tokio::time::timeout(self.explanation_budget, task).await {
            Ok(Ok(Some(explanation))) => {
                if explanation.fallback_reason.is_some() {
                    metrics::counter!(
                        "sentiscope_explanation_fallbacks_total",
                        "reason" => "perturbation"
                    )
                    .increment(1);
                }
                explanation.items
            }
            Ok(Ok(None)) => Vec::new(),
            Ok(Err(e)) => {
                warn!("Explanation task for {} failed: {}", name, e);
                metrics::counter!("sentiscope_explanation_fallbacks_total", "reason" => "task")
                    .increment(1);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Explanation for {} exceeded {}ms budget, responding without words",
                    name,
                    self.explanation_budget.as_millis()
                );
                metrics::counter!("sentiscope_explanation_fallbacks_total", "reason" => "budget")
                    .increment(1);
                Vec::new()
            }
        }
    }
}
