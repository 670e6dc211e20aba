//! Feature encoding for ML inference
//!
//! Maps validated policy attributes onto the fixed 14-column layout the
//! classifiers were trained on: seven numeric columns copied as-is followed
//! by three one-hot groups.

use crate::models::PolicyAttributes;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of input features expected by the models
pub const NUM_FEATURES: usize = 14;

/// Column names in training order
pub const FEATURE_COLUMNS: [&str; NUM_FEATURES] = [
    "Age",
    "Driving_License",
    "Region_Code",
    "Previously_Insured",
    "Annual_Premium",
    "Policy_Sales_Channel",
    "Vintage",
    "Gender_Female",
    "Gender_Male",
    "Vehicle_Age_< 1 Year",
    "Vehicle_Age_1-2 Year",
    "Vehicle_Age_> 2 Years",
    "Vehicle_Damage_No",
    "Vehicle_Damage_Yes",
];

pub const GENDER_PREFIX: &str = "Gender_";
pub const VEHICLE_AGE_PREFIX: &str = "Vehicle_Age_";
pub const VEHICLE_DAMAGE_PREFIX: &str = "Vehicle_Damage_";

/// Encoded feature vector in training column order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; NUM_FEATURES]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; NUM_FEATURES] {
        &self.0
    }

    /// Value of a named column, `None` if the name is not in the schema
    pub fn get(&self, column: &str) -> Option<f64> {
        column_index(column).map(|idx| self.0[idx])
    }

    /// Single-precision copy for the ONNX runtime
    pub fn to_f32(&self) -> [f32; NUM_FEATURES] {
        self.0.map(|v| v as f32)
    }
}

impl From<[f64; NUM_FEATURES]> for FeatureVector {
    fn from(values: [f64; NUM_FEATURES]) -> Self {
        Self(values)
    }
}

fn column_index(column: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == column)
}

/// Set the one-hot slot named `prefix + value`.
///
/// Returns `false` and leaves `slots` untouched when the name matches no
/// column, so the whole group stays zero.
pub fn set_one_hot(slots: &mut [f64; NUM_FEATURES], prefix: &str, value: &str) -> bool {
    let column = format!("{}{}", prefix, value);
    match column_index(&column) {
        Some(idx) => {
            slots[idx] = 1.0;
            true
        }
        None => false,
    }
}

/// Encode policy attributes into a feature vector
pub fn encode(attrs: &PolicyAttributes) -> FeatureVector {
    let mut slots = [0.0; NUM_FEATURES];

    slots[0] = f64::from(attrs.age);
    slots[1] = f64::from(attrs.driving_license);
    slots[2] = f64::from(attrs.region_code);
    slots[3] = f64::from(attrs.previously_insured);
    slots[4] = attrs.annual_premium;
    slots[5] = f64::from(attrs.policy_sales_channel);
    slots[6] = f64::from(attrs.vintage);

    let groups = [
        (GENDER_PREFIX, attrs.gender.as_str()),
        (VEHICLE_AGE_PREFIX, attrs.vehicle_age.as_str()),
        (VEHICLE_DAMAGE_PREFIX, attrs.vehicle_damage.as_str()),
    ];
    for (prefix, value) in groups {
        // Unmapped literals degrade to an all-zero group; flagged for review
        // since it can only happen if a value bypassed validation.
        if !set_one_hot(&mut slots, prefix, value) {
            warn!(prefix = %prefix, value = %value, "Categorical value has no feature column");
        }
    }

    FeatureVector(slots)
}
