//! BMI classification and calorie/macro targets.
//!
//! BMR uses the Mifflin-St Jeor equation with a fixed age of 30 and the male
//! constant, then a moderate activity factor of 1.55. Stateless.

use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};

const METERS_PER_INCH: f64 = 0.0254;
const CM_PER_INCH: f64 = 2.54;
const ASSUMED_AGE: f64 = 30.0;
const MODERATE_ACTIVITY: f64 = 1.55;
const CALORIE_ADJUSTMENT: i64 = 500;

const INVALID_MSG: &str = "Please enter a valid weight and height";
const NON_POSITIVE_MSG: &str = "Please enter a positive weight and height";

/// Validated body measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMetrics {
    weight_kg: f64,
    height_in: f64,
}

impl BodyMetrics {
    pub fn new(weight_kg: f64, height_in: f64) -> TrackerResult<Self> {
        if !weight_kg.is_finite() || !height_in.is_finite() {
            return Err(TrackerError::invalid(INVALID_MSG));
        }
        if weight_kg <= 0.0 || height_in <= 0.0 {
            return Err(TrackerError::invalid(NON_POSITIVE_MSG));
        }
        Ok(Self {
            weight_kg,
            height_in,
        })
    }

    /// Parse raw form input such as "70" and "70.5".
    pub fn parse(weight: &str, height: &str) -> TrackerResult<Self> {
        let parse = |s: &str| s.trim().parse::<f64>().ok();
        match (parse(weight), parse(height)) {
            (Some(w), Some(h)) => Self::new(w, h),
            _ => Err(TrackerError::invalid(INVALID_MSG)),
        }
    }

    #[must_use]
    pub fn bmi(&self) -> f64 {
        let meters = self.height_in * METERS_PER_INCH;
        self.weight_kg / (meters * meters)
    }

    /// Basal metabolic rate in kcal/day.
    #[must_use]
    pub fn bmr(&self) -> f64 {
        let cm = self.height_in * CM_PER_INCH;
        10.0 * self.weight_kg + 6.25 * cm - 5.0 * ASSUMED_AGE + 5.0
    }

    /// Maintenance calories at moderate activity.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn maintenance_calories(&self) -> i64 {
        (self.bmr() * MODERATE_ACTIVITY).round() as i64
    }

    #[must_use]
    pub fn assess(&self) -> BmiAssessment {
        let bmi = self.bmi();
        let category = BmiCategory::from_bmi(bmi);
        let maintenance = self.maintenance_calories();
        let target = match category {
            BmiCategory::Underweight => maintenance.saturating_add(CALORIE_ADJUSTMENT),
            BmiCategory::Normal => maintenance,
            BmiCategory::Overweight | BmiCategory::Obese => {
                maintenance.saturating_sub(CALORIE_ADJUSTMENT)
            }
        };

        BmiAssessment {
            bmi: (bmi * 10.0).round() / 10.0,
            category,
            message: format!("You are {}", category.label()),
            maintenance_calories: maintenance,
            target_calories: target,
            macros: MacroTargets::for_category(category, self.weight_kg, target),
            recommendation: Recommendation::for_category(category),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

/// Daily macro targets in grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroTargets {
    pub protein_g: i64,
    pub carbs_g: i64,
    pub fat_g: i64,
}

impl MacroTargets {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn for_category(category: BmiCategory, weight_kg: f64, target_calories: i64) -> Self {
        let (protein_per_kg, carb_share) = match category {
            BmiCategory::Underweight => (1.6, 0.5),
            BmiCategory::Normal => (1.2, 0.5),
            BmiCategory::Overweight | BmiCategory::Obese => (1.4, 0.4),
        };
        let calories = target_calories as f64;
        Self {
            protein_g: (weight_kg * protein_per_kg).round() as i64,
            carbs_g: (calories * carb_share / 4.0).round() as i64,
            fat_g: (calories * 0.3 / 9.0).round() as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub title: &'static str,
    pub details: &'static str,
    pub tips: &'static [&'static str],
}

impl Recommendation {
    #[must_use]
    pub fn for_category(category: BmiCategory) -> Self {
        match category {
            BmiCategory::Underweight => Self {
                title: "Weight Gain Recommendation",
                details: "Focus on calorie-dense foods and increase protein intake to build \
                          healthy muscle mass. Include nuts, avocados, whole grains, and lean \
                          proteins.",
                tips: &[
                    "Eat 5-6 small meals per day",
                    "Add healthy fats to meals",
                    "Include protein shakes",
                    "Focus on strength training",
                ],
            },
            BmiCategory::Normal => Self {
                title: "Maintenance Recommendation",
                details: "Maintain your current healthy diet with balanced macronutrients. \
                          Continue with a variety of fruits, vegetables, lean proteins, and \
                          whole grains.",
                tips: &[
                    "Eat a balanced diet",
                    "Stay hydrated",
                    "Regular exercise",
                    "Get adequate sleep",
                ],
            },
            BmiCategory::Overweight | BmiCategory::Obese => Self {
                title: "Weight Loss Recommendation",
                details: "Focus on nutrient-dense, lower calorie foods and create a moderate \
                          calorie deficit. Emphasize vegetables, lean proteins, and complex \
                          carbohydrates.",
                tips: &[
                    "Reduce portion sizes",
                    "Increase vegetable intake",
                    "Choose lean proteins",
                    "Stay active daily",
                ],
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BmiAssessment {
    /// Rounded to one decimal for display.
    pub bmi: f64,
    pub category: BmiCategory,
    pub message: String,
    pub maintenance_calories: i64,
    pub target_calories: i64,
    pub macros: MacroTargets,
    pub recommendation: Recommendation,
}
