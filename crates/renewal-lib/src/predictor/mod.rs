//! ML prediction engine

mod dispatch;
mod features;
mod inference;

pub use dispatch::PredictionDispatcher;
pub use features::{
    encode, set_one_hot, FeatureVector, FEATURE_COLUMNS, GENDER_PREFIX, NUM_FEATURES,
    VEHICLE_AGE_PREFIX, VEHICLE_DAMAGE_PREFIX,
};
pub use inference::{
    sha256_hex, ModelRegistry, ModelSource, ModelSources, OnnxClassifier,
    MAX_INFERENCE_MS,
};

use anyhow::Result;

/// Trait for trained binary classifiers
///
/// Both calls take a batch of feature vectors and return one entry per row.
pub trait ClassifierHandle: Send + Sync {
    /// Predicted class label for each row
    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<i64>>;

    /// Class probability distribution for each row, indexed by class label
    fn predict_proba(&self, batch: &[FeatureVector]) -> Result<Vec<Vec<f32>>>;

    /// Labels and probabilities together; implementations that produce both
    /// from one pass should override this
    fn classify(&self, batch: &[FeatureVector]) -> Result<(Vec<i64>, Vec<Vec<f32>>)> {
        Ok((self.predict(batch)?, self.predict_proba(batch)?))
    }
}
