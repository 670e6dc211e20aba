//! Health tracking for the prediction service
//!
//! Each loaded classifier is a component. A classifier whose last inference
//! failed is reported degraded; after [`UNHEALTHY_AFTER_FAILURES`] consecutive
//! failures it is reported unhealthy until a request on it succeeds again.
//! The service as a whole only fails its probes once no classifier is left
//! operational, since requests for the other model are unaffected.

use crate::models::ModelChoice;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive inference failures before a model counts as unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 5;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }

    /// Returns true if the component can still serve requests
    pub fn is_operational(&self) -> bool {
        !matches!(self, ComponentStatus::Unhealthy)
    }
}

/// State of a single classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// SHA-256 of the artifact backing this component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub consecutive_failures: u32,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn loaded(checksum: Option<String>) -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            checksum,
            consecutive_failures: 0,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    fn touch(&mut self) {
        self.last_check_timestamp = chrono::Utc::now().timestamp();
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Unhealthy only when every component is, degraded when any is not
    /// healthy, healthy when all are (or there are none)
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        if components.is_empty() {
            return ComponentStatus::Healthy;
        }
        if components.values().all(|c| !c.status.is_operational()) {
            ComponentStatus::Unhealthy
        } else if components
            .values()
            .any(|c| c.status != ComponentStatus::Healthy)
        {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    use crate::models::ModelChoice;

    pub const BAGGING_MODEL: &str = "bagging_model";
    pub const BOOSTING_MODEL: &str = "boosting_model";

    pub fn for_model(model: ModelChoice) -> &'static str {
        match model {
            ModelChoice::Bagging => BAGGING_MODEL,
            ModelChoice::Boosting => BOOSTING_MODEL,
        }
    }
}

/// Shared registry of classifier health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded model as healthy
    pub async fn register_model(&self, model: ModelChoice, checksum: Option<String>) {
        self.components.write().await.insert(
            components::for_model(model).to_string(),
            ComponentHealth::loaded(checksum),
        );
    }

    /// Reset the model's failure streak after a successful prediction
    pub async fn record_success(&self, model: ModelChoice) {
        // Read first so the hot path avoids the write lock
        let name = components::for_model(model);
        let clean = self
            .components
            .read()
            .await
            .get(name)
            .map(|c| c.consecutive_failures == 0)
            .unwrap_or(true);
        if clean {
            return;
        }

        if let Some(component) = self.components.write().await.get_mut(name) {
            component.status = ComponentStatus::Healthy;
            component.message = None;
            component.consecutive_failures = 0;
            component.touch();
        }
    }

    /// Count an inference failure against the model
    pub async fn record_failure(&self, model: ModelChoice, message: impl Into<String>) {
        let mut table = self.components.write().await;
        let component = table
            .entry(components::for_model(model).to_string())
            .or_insert_with(|| ComponentHealth::loaded(None));

        component.consecutive_failures = component.consecutive_failures.saturating_add(1);
        component.status = if component.consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        component.message = Some(message.into());
        component.touch();
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Models not yet loaded".to_string()),
            };
        }

        let components = self.components.read().await;
        if components.values().any(|c| c.status.is_operational()) {
            return ReadinessResponse {
                ready: true,
                reason: None,
            };
        }

        let mut unhealthy: Vec<&str> = components.keys().map(String::as_str).collect();
        unhealthy.sort_unstable();
        ReadinessResponse {
            ready: false,
            reason: Some(if unhealthy.is_empty() {
                "No models registered".to_string()
            } else {
                format!("Unhealthy: {}", unhealthy.join(", "))
            }),
        }
    }
}
