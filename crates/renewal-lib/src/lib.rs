//! Library for insurance policy renewal prediction
//!
//! This crate provides the core functionality for:
//! - Encoding policy attributes into the models' feature layout
//! - Loading ONNX classifiers and dispatching predictions to them
//! - Health tracking and observability for the serving layer

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;

pub use error::{LoadError, PredictError, UnknownCategory, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ClassifierHandle, FeatureVector, PredictionDispatcher};
