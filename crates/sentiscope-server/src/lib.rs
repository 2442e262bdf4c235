//! Sentiscope Server
//!
//! Request orchestration over the model registry and the HTTP surface that
//! exposes it: single-backend prediction, all-backend comparison, backend
//! status and Prometheus metrics.

pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod routes;

pub use cli::Cli;
pub use config::ServerConfig;
pub use orchestrator::{CompareResponse, Orchestrator, PredictionResponse};
pub use routes::{create_router, AppState};
