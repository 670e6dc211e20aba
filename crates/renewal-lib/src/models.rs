//! Core data models for the renewal predictor

use crate::error::{UnknownCategory, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy attributes submitted for a renewal prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyAttributes {
    pub age: u32,
    pub driving_license: u8,
    pub region_code: i32,
    pub previously_insured: u8,
    pub annual_premium: f64,
    pub policy_sales_channel: i32,
    pub vintage: u32,
    pub gender: Gender,
    pub vehicle_age: VehicleAge,
    pub vehicle_damage: VehicleDamage,
    #[serde(default, alias = "model_type")]
    pub model_choice: ModelChoice,
}

impl PolicyAttributes {
    /// Check the numeric bounds the type system does not already enforce.
    ///
    /// Unsigned fields cover the non-negative integers; the binary flags and
    /// the premium still need checking here. The premium must also survive
    /// the narrowing to `f32` the classifiers take as input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.driving_license > 1 {
            return Err(ValidationError::NotBinary {
                field: "driving_license",
                value: self.driving_license,
            });
        }
        if self.previously_insured > 1 {
            return Err(ValidationError::NotBinary {
                field: "previously_insured",
                value: self.previously_insured,
            });
        }
        if !self.annual_premium.is_finite() || !(self.annual_premium as f32).is_finite() {
            return Err(ValidationError::NotFinite {
                field: "annual_premium",
            });
        }
        if self.annual_premium < 0.0 {
            return Err(ValidationError::Negative {
                field: "annual_premium",
                value: self.annual_premium,
            });
        }
        Ok(())
    }
}

/// Generates a closed string enum whose serde form, `Display` and `FromStr`
/// all use the exact literals the models were trained on.
macro_rules! literal_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $literal:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $literal)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $literal,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownCategory;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($literal => Ok($name::$variant),)+
                    other => Err(UnknownCategory {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

literal_enum! {
    /// Policy holder gender
    Gender, "gender" {
        Male => "Male",
        Female => "Female",
    }
}

literal_enum! {
    /// Age bracket of the insured vehicle
    VehicleAge, "vehicle_age" {
        LessThanOneYear => "< 1 Year",
        OneToTwoYears => "1-2 Year",
        MoreThanTwoYears => "> 2 Years",
    }
}

literal_enum! {
    /// Whether the vehicle was damaged in the past
    VehicleDamage, "vehicle_damage" {
        Yes => "Yes",
        No => "No",
    }
}

literal_enum! {
    /// Which of the two pre-trained classifiers serves the request
    ModelChoice, "model_choice" {
        Bagging => "bagging",
        Boosting => "boosting",
    }
}

impl Default for ModelChoice {
    fn default() -> Self {
        ModelChoice::Bagging
    }
}

/// Outcome of a single renewal prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model: ModelChoice,
    #[serde(rename = "prediction")]
    pub label: u8,
    pub probability: f64,
}
