//! ONNX inference using tract
//!
//! Loads the two scikit-learn classifiers exported to ONNX (ZipMap disabled)
//! and runs them on encoded feature vectors. Output 0 of each graph holds the
//! predicted labels, output 1 the `[rows, classes]` probability matrix.

use super::dispatch::PredictionDispatcher;
use super::{ClassifierHandle, FeatureVector, NUM_FEATURES};
use crate::error::LoadError;
use crate::models::ModelChoice;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
pub const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Location of a model artifact on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    pub path: PathBuf,
    /// Expected SHA-256 of the file, lowercase hex
    #[serde(default)]
    pub checksum: Option<String>,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }
}

/// Artifact locations for both named models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSources {
    pub bagging: ModelSource,
    pub boosting: ModelSource,
}

impl ModelSources {
    pub fn iter(&self) -> impl Iterator<Item = (ModelChoice, &ModelSource)> {
        [
            (ModelChoice::Bagging, &self.bagging),
            (ModelChoice::Boosting, &self.boosting),
        ]
        .into_iter()
    }
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// ONNX classifier executed with tract
pub struct OnnxClassifier {
    model: ModelChoice,
    path: PathBuf,
    plan: TractModel,
    checksum: String,
}

impl OnnxClassifier {
    /// Load a classifier artifact, verifying its checksum when one is given
    pub fn load(model: ModelChoice, source: &ModelSource) -> Result<Self, LoadError> {
        let bytes = std::fs::read(&source.path).map_err(|e| LoadError::Io {
            path: source.path.clone(),
            source: e,
        })?;

        let checksum = sha256_hex(&bytes);
        if let Some(expected) = &source.checksum {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(LoadError::ChecksumMismatch {
                    path: source.path.clone(),
                    expected: expected.clone(),
                    actual: checksum,
                });
            }
        }

        let plan = Self::load_model(&bytes).map_err(|e| LoadError::Model {
            model,
            path: source.path.clone(),
            message: format!("{:#}", e),
        })?;

        debug!(model = %model, path = ?source.path, checksum = %checksum, "Model loaded");

        Ok(Self {
            model,
            path: source.path.clone(),
            plan,
            checksum,
        })
    }

    /// Parse and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    pub fn model(&self) -> ModelChoice {
        self.model
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SHA-256 of the artifact this classifier was built from
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    fn run(&self, batch: &[FeatureVector]) -> Result<TVec<TValue>> {
        // The input fact is fixed at one row
        anyhow::ensure!(
            batch.len() == 1,
            "expected a batch of exactly one row, got {}",
            batch.len()
        );

        let start = Instant::now();
        let data: Vec<f32> = batch.iter().flat_map(|fv| fv.to_f32()).collect();
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((batch.len(), NUM_FEATURES), data)?.into();

        let outputs = self.plan.run(tvec!(input.into()))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                model = %self.model,
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(model = %self.model, elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(outputs)
    }
}

impl ClassifierHandle for OnnxClassifier {
    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<i64>> {
        labels(&self.run(batch)?)
    }

    fn predict_proba(&self, batch: &[FeatureVector]) -> Result<Vec<Vec<f32>>> {
        probabilities(&self.run(batch)?)
    }

    fn classify(&self, batch: &[FeatureVector]) -> Result<(Vec<i64>, Vec<Vec<f32>>)> {
        // Both outputs come from the same graph run
        let outputs = self.run(batch)?;
        Ok((labels(&outputs)?, probabilities(&outputs)?))
    }
}

fn labels(outputs: &TVec<TValue>) -> Result<Vec<i64>> {
    let output = outputs.first().context("No label output from model")?;
    let labels = output
        .cast_to::<i64>()
        .context("Label output is not numeric")?;
    Ok(labels.as_slice::<i64>()?.to_vec())
}

fn probabilities(outputs: &TVec<TValue>) -> Result<Vec<Vec<f32>>> {
    let output = outputs
        .get(1)
        .context("No probability output from model (was it exported with ZipMap?)")?;

    let shape = output.shape();
    if shape.len() != 2 || shape[1] == 0 {
        anyhow::bail!("Probability output has shape {:?}, expected [rows, classes]", shape);
    }
    let classes = shape[1];

    let probabilities = output
        .cast_to::<f32>()
        .context("Probability output is not numeric")?;
    Ok(probabilities
        .as_slice::<f32>()?
        .chunks(classes)
        .map(|row| row.to_vec())
        .collect())
}

/// The two classifiers loaded at startup
pub struct ModelRegistry {
    classifiers: Vec<Arc<OnnxClassifier>>,
}

impl ModelRegistry {
    /// Load every model; any single failure fails the whole registry
    pub fn load(sources: &ModelSources) -> Result<Self, LoadError> {
        let classifiers = sources
            .iter()
            .map(|(model, source)| OnnxClassifier::load(model, source).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { classifiers })
    }

    pub fn classifiers(&self) -> impl Iterator<Item = &OnnxClassifier> {
        self.classifiers.iter().map(|c| c.as_ref())
    }

    /// Build a dispatcher sharing the loaded classifiers
    pub fn dispatcher(&self) -> PredictionDispatcher {
        PredictionDispatcher::from_handles(self.classifiers.iter().map(|c| {
            let handle: Arc<dyn ClassifierHandle> = c.clone();
            (c.model(), handle)
        }))
    }
}
