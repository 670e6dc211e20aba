//! Prediction dispatch
//!
//! Routes an encoded feature vector to the classifier named by the request
//! and packages label and positive-class probability.

use super::features::{encode, FeatureVector};
use super::ClassifierHandle;
use crate::error::PredictError;
use crate::models::{ModelChoice, PolicyAttributes, PredictionResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Index of the positive class in a two-class probability row
const POSITIVE_CLASS: usize = 1;

/// Read-only table of named classifiers
#[derive(Clone)]
pub struct PredictionDispatcher {
    handles: HashMap<ModelChoice, Arc<dyn ClassifierHandle>>,
}

impl PredictionDispatcher {
    pub fn new(bagging: Arc<dyn ClassifierHandle>, boosting: Arc<dyn ClassifierHandle>) -> Self {
        Self::from_handles([
            (ModelChoice::Bagging, bagging),
            (ModelChoice::Boosting, boosting),
        ])
    }

    pub fn from_handles(
        handles: impl IntoIterator<Item = (ModelChoice, Arc<dyn ClassifierHandle>)>,
    ) -> Self {
        Self {
            handles: handles.into_iter().collect(),
        }
    }

    pub fn has_model(&self, model: ModelChoice) -> bool {
        self.handles.contains_key(&model)
    }

    /// Encode the attributes and run the model they ask for
    pub fn predict(&self, attrs: &PolicyAttributes) -> Result<PredictionResult, PredictError> {
        let features = encode(attrs);
        self.dispatch(&features, attrs.model_choice)
    }

    /// Run one feature vector through the named classifier
    pub fn dispatch(
        &self,
        features: &FeatureVector,
        model: ModelChoice,
    ) -> Result<PredictionResult, PredictError> {
        let handle = self
            .handles
            .get(&model)
            .ok_or(PredictError::ModelUnavailable(model))?;

        let batch = std::slice::from_ref(features);
        let inference = |message: String| PredictError::Inference { model, message };

        let (labels, probabilities) = handle
            .classify(batch)
            .map_err(|e| inference(format!("{:#}", e)))?;

        let probability = probabilities
            .first()
            .and_then(|row| row.get(POSITIVE_CLASS))
            .copied()
            .ok_or_else(|| inference("probability output has no positive-class column".into()))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(inference(format!(
                "probability {} is outside [0, 1]",
                probability
            )));
        }

        let label = match labels.first().copied() {
            Some(0) => 0,
            Some(1) => 1,
            Some(other) => return Err(inference(format!("label {} is not 0 or 1", other))),
            None => return Err(inference("label output is empty".into())),
        };

        Ok(PredictionResult {
            model,
            label,
            probability: f64::from(probability),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, VehicleAge, VehicleDamage};
    use crate::predictor::NUM_FEATURES;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedClassifier {
        label: i64,
        proba: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedClassifier {
        fn new(label: i64, positive: f32) -> Arc<Self> {
            Arc::new(Self {
                label,
                proba: vec![1.0 - positive, positive],
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ClassifierHandle for FixedClassifier {
        fn predict(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<i64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![self.label; batch.len()])
        }

        fn predict_proba(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![self.proba.clone(); batch.len()])
        }
    }

    struct BrokenClassifier;

    impl ClassifierHandle for BrokenClassifier {
        fn predict(&self, _batch: &[FeatureVector]) -> anyhow::Result<Vec<i64>> {
            anyhow::bail!("tree ensemble exploded")
        }

        fn predict_proba(&self, _batch: &[FeatureVector]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("tree ensemble exploded")
        }
    }

    /// Checks the batch shape it receives before answering
    struct ShapeCheckingClassifier;

    impl ClassifierHandle for ShapeCheckingClassifier {
        fn predict(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<i64>> {
            anyhow::ensure!(batch.len() == 1, "batch of {}", batch.len());
            Ok(vec![0])
        }

        fn predict_proba(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::ensure!(batch.len() == 1, "batch of {}", batch.len());
            anyhow::ensure!(batch[0].values().len() == NUM_FEATURES);
            Ok(vec![vec![0.9, 0.1]])
        }
    }

    fn create_test_attributes(model_choice: ModelChoice) -> PolicyAttributes {
        PolicyAttributes {
            age: 35,
            driving_license: 1,
            region_code: 28,
            previously_insured: 0,
            annual_premium: 35000.0,
            policy_sales_channel: 152,
            vintage: 200,
            gender: Gender::Male,
            vehicle_age: VehicleAge::OneToTwoYears,
            vehicle_damage: VehicleDamage::Yes,
            model_choice,
        }
    }

    #[test]
    fn test_bagging_dispatches_to_bagging_handle() {
        let bagging = FixedClassifier::new(1, 0.8);
        let boosting = FixedClassifier::new(0, 0.2);
        let dispatcher = PredictionDispatcher::new(bagging.clone(), boosting.clone());

        let result = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap();

        assert_eq!(result.model, ModelChoice::Bagging);
        assert_eq!(result.label, 1);
        assert!((result.probability - 0.8).abs() < 1e-6);
        assert_eq!(bagging.calls.load(Ordering::SeqCst), 2);
        assert_eq!(boosting.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_boosting_dispatches_to_boosting_handle() {
        let bagging = FixedClassifier::new(1, 0.8);
        let boosting = FixedClassifier::new(0, 0.25);
        let dispatcher = PredictionDispatcher::new(bagging.clone(), boosting.clone());

        let result = dispatcher
            .predict(&create_test_attributes(ModelChoice::Boosting))
            .unwrap();

        assert_eq!(result.model, ModelChoice::Boosting);
        assert_eq!(result.label, 0);
        assert!((result.probability - 0.25).abs() < 1e-6);
        assert_eq!(bagging.calls.load(Ordering::SeqCst), 0);
        assert_eq!(boosting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_single_row_batch_is_sent() {
        let dispatcher = PredictionDispatcher::new(
            Arc::new(ShapeCheckingClassifier),
            Arc::new(ShapeCheckingClassifier),
        );
        let result = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap();
        assert_eq!(result.label, 0);
    }

    #[test]
    fn test_failing_model_does_not_affect_other_model() {
        let dispatcher = PredictionDispatcher::new(
            Arc::new(BrokenClassifier),
            FixedClassifier::new(1, 0.6),
        );

        let err = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap_err();
        match &err {
            PredictError::Inference { model, message } => {
                assert_eq!(*model, ModelChoice::Bagging);
                assert!(message.contains("tree ensemble exploded"));
            }
            other => panic!("expected inference error, got {:?}", other),
        }

        let ok = dispatcher
            .predict(&create_test_attributes(ModelChoice::Boosting))
            .unwrap();
        assert_eq!(ok.label, 1);
    }

    #[test]
    fn test_out_of_range_probability_is_inference_error() {
        let dispatcher =
            PredictionDispatcher::new(FixedClassifier::new(1, 1.5), FixedClassifier::new(1, 0.5));
        let err = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap_err();
        assert!(matches!(err, PredictError::Inference { .. }));
    }

    #[test]
    fn test_nan_probability_is_inference_error() {
        let dispatcher = PredictionDispatcher::new(
            FixedClassifier::new(1, f32::NAN),
            FixedClassifier::new(1, 0.5),
        );
        assert!(dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .is_err());
    }

    #[test]
    fn test_non_binary_label_is_inference_error() {
        let dispatcher =
            PredictionDispatcher::new(FixedClassifier::new(2, 0.5), FixedClassifier::new(1, 0.5));
        let err = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap_err();
        assert!(err.to_string().contains("not 0 or 1"));
    }

    #[test]
    fn test_single_class_output_is_inference_error() {
        let narrow = Arc::new(FixedClassifier {
            label: 0,
            proba: vec![1.0],
            calls: AtomicUsize::new(0),
        });
        let dispatcher = PredictionDispatcher::new(narrow, FixedClassifier::new(1, 0.5));
        let err = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap_err();
        assert!(err.to_string().contains("positive-class"));
    }

    #[test]
    fn test_missing_handle_is_unavailable() {
        let boosting: Arc<dyn ClassifierHandle> = FixedClassifier::new(1, 0.5);
        let dispatcher = PredictionDispatcher::from_handles([(ModelChoice::Boosting, boosting)]);

        assert!(!dispatcher.has_model(ModelChoice::Bagging));
        let err = dispatcher
            .predict(&create_test_attributes(ModelChoice::Bagging))
            .unwrap_err();
        assert!(matches!(err, PredictError::ModelUnavailable(ModelChoice::Bagging)));
    }

    #[test]
    fn test_dispatch_uses_given_vector() {
        let dispatcher =
            PredictionDispatcher::new(FixedClassifier::new(1, 0.9), FixedClassifier::new(0, 0.1));
        let features = FeatureVector::from([0.0; NUM_FEATURES]);
        let result = dispatcher.dispatch(&features, ModelChoice::Boosting).unwrap();
        assert_eq!(result.model, ModelChoice::Boosting);
        assert_eq!(result.label, 0);
    }
}
