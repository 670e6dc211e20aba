//! Renewal prediction service
//!
//! Loads the bagging and boosting classifiers, then serves predictions,
//! health probes and metrics over HTTP until interrupted.

use anyhow::{Context, Result};
use renewal_lib::{
    health::HealthRegistry,
    observability::{ServiceMetrics, StructuredLogger},
    predictor::ModelRegistry,
    ModelChoice,
};
use renewal_server::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting renewal-server");

    let config = ServiceConfig::load()?;
    info!(instance = %config.instance_name, "Service configured");

    let logger = StructuredLogger::new(&config.instance_name);

    // Both models must load before the listener binds
    let registry =
        ModelRegistry::load(&config.model_sources()).context("Failed to load classifiers")?;

    let health_registry = HealthRegistry::new();
    let metrics = ServiceMetrics::new();
    for classifier in registry.classifiers() {
        let checksum = classifier.checksum();
        health_registry
            .register_model(classifier.model(), Some(checksum.to_string()))
            .await;
        metrics.set_model_info(classifier.model(), checksum);
        logger.log_model_loaded(
            classifier.model(),
            &classifier.path().display().to_string(),
            checksum,
        );
    }

    let dispatcher = registry.dispatcher();
    for &model in ModelChoice::ALL {
        anyhow::ensure!(dispatcher.has_model(model), "No classifier loaded for {}", model);
    }

    let state = Arc::new(api::AppState::new(
        Arc::new(dispatcher),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let addr = config.listen_addr();
    logger.log_startup(SERVICE_VERSION, &addr);

    let shutdown_logger = logger.clone();
    api::serve(&addr, state, async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGINT, serving until killed");
                std::future::pending::<()>().await;
            }
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
