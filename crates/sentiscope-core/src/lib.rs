//! Sentiscope Core
//!
//! Types and errors shared by the model crate and the serving layer.
//!
//! This crate provides:
//! - The error taxonomy for artifact loading, inference and explanation
//! - Prediction and explanation value types

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{round_to, ExplanationItem, PredictionResult, Sentiment};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ExplanationItem, PredictionResult, Sentiment};
}
