use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Calories and macros for one serving, or for a scaled amount of servings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: i64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub serving_size: Option<String>,
    pub calories: i64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub created_at: String,
}

impl FoodItem {
    #[must_use]
    pub fn facts(&self) -> Nutrition {
        Nutrition {
            calories: self.calories,
            carbs: self.carbs,
            protein: self.protein,
            fat: self.fat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFoodItem {
    pub name: String,
    pub serving_size: Option<String>,
    pub calories: i64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

/// What a meal entry was logged from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MealSource {
    /// A catalog food; nutrition is scaled from its facts.
    Food { food_id: i64 },
    /// Free text with no tracked nutrition.
    Custom { name: String },
}

impl MealSource {
    /// Build a source from the two optional request fields. A food id wins
    /// over a custom name when both are supplied.
    pub fn from_parts(food_id: Option<i64>, custom_name: Option<&str>) -> TrackerResult<Self> {
        if let Some(food_id) = food_id {
            return Ok(Self::Food { food_id });
        }
        match custom_name.map(str::trim) {
            Some(name) if !name.is_empty() => Ok(Self::Custom {
                name: name.to_string(),
            }),
            _ => Err(TrackerError::MissingParameter("food_id or custom_name")),
        }
    }

    #[must_use]
    pub fn food_id(&self) -> Option<i64> {
        match self {
            Self::Food { food_id } => Some(*food_id),
            Self::Custom { .. } => None,
        }
    }

    #[must_use]
    pub fn custom_name(&self) -> Option<&str> {
        match self {
            Self::Food { .. } => None,
            Self::Custom { name } => Some(name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealEntry {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub meal_type: String,
    pub source: MealSource,
    pub servings: f64,
    pub calories: Option<i64>,
    pub carbs: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    // Joined fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
}

impl MealEntry {
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.source {
            MealSource::Custom { name } => name,
            MealSource::Food { .. } => self.food_name.as_deref().unwrap_or("?"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMealEntry {
    pub user_id: String,
    pub date: NaiveDate,
    pub meal_type: String,
    pub source: MealSource,
    pub servings: f64,
    pub nutrition: Option<Nutrition>,
}

#[derive(Debug, Clone, Default)]
pub struct MealUpdate {
    pub servings: Option<f64>,
    pub meal_type: Option<String>,
    pub date: Option<NaiveDate>,
}

impl MealUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servings.is_none() && self.meal_type.is_none() && self.date.is_none()
    }
}

/// The four daily targets a user can save. Unset fields stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GoalTargets {
    #[serde(default)]
    pub daily_calories: Option<i64>,
    #[serde(default)]
    pub daily_carbs: Option<f64>,
    #[serde(default)]
    pub daily_protein: Option<f64>,
    #[serde(default)]
    pub daily_fat: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGoal {
    pub user_id: String,
    pub daily_calories: Option<i64>,
    pub daily_carbs: Option<f64>,
    pub daily_protein: Option<f64>,
    pub daily_fat: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserGoal {
    #[must_use]
    pub fn targets(&self) -> GoalTargets {
        GoalTargets {
            daily_calories: self.daily_calories,
            daily_carbs: self.daily_carbs,
            daily_protein: self.daily_protein,
            daily_fat: self.daily_fat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DailyTotals {
    pub total_calories: i64,
    pub total_carbs: f64,
    pub total_protein: f64,
    pub total_fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealTypeBreakdown {
    pub meal_type: String,
    pub entry_count: usize,
    pub calories: i64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroProgress {
    pub current: f64,
    pub target: Option<f64>,
    pub percent: i64,
    pub level: ProgressLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub calories: MacroProgress,
    pub carbs: MacroProgress,
    pub protein: MacroProgress,
    pub fat: MacroProgress,
}

/// Each macro's share of the day's total macro grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MacroSplit {
    pub carbs_pct: i64,
    pub protein_pct: i64,
    pub fat_pct: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyReport {
    pub user_id: String,
    pub date: String,
    pub totals: DailyTotals,
    pub goal: Option<UserGoal>,
    pub progress: GoalProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_split: Option<MacroSplit>,
    pub breakdown: Vec<MealTypeBreakdown>,
}

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_meal_type(meal: &str) -> TrackerResult<String> {
    let lower = meal.trim().to_lowercase();
    if MEAL_TYPES.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(TrackerError::invalid(format!(
            "Invalid meal type '{meal}'. Must be one of: {}",
            MEAL_TYPES.join(", ")
        )))
    }
}

/// Servings on creation: absent or non-positive falls back to one serving.
pub fn resolve_servings(servings: Option<f64>) -> TrackerResult<f64> {
    match servings {
        None => Ok(1.0),
        Some(s) if !s.is_finite() => Err(TrackerError::invalid("servings must be a number")),
        Some(s) if s <= 0.0 => Ok(1.0),
        Some(s) => Ok(s),
    }
}

/// Servings on edit must be stated explicitly and be positive.
pub fn validate_servings(servings: f64) -> TrackerResult<f64> {
    if !servings.is_finite() || servings <= 0.0 {
        return Err(TrackerError::invalid("servings must be greater than 0"));
    }
    Ok(servings)
}

pub fn parse_date(date: &str) -> TrackerResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| TrackerError::invalid(format!("Invalid date '{date}'. Use YYYY-MM-DD")))
}

/// Validate catalog data: name must not be empty, facts must not be negative.
pub fn validate_food(food: &NewFoodItem) -> TrackerResult<()> {
    if food.name.trim().is_empty() {
        return Err(TrackerError::invalid("Food name must not be empty"));
    }
    if food.calories < 0 {
        return Err(TrackerError::invalid("calories must not be negative"));
    }
    for (label, value) in [
        ("carbs", food.carbs),
        ("protein", food.protein),
        ("fat", food.fat),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(TrackerError::invalid(format!(
                "{label} must be a non-negative number"
            )));
        }
    }
    Ok(())
}

/// Validate goal targets: any value that is set must not be negative.
pub fn validate_goal_targets(targets: &GoalTargets) -> TrackerResult<()> {
    if targets.daily_calories.is_some_and(|c| c < 0) {
        return Err(TrackerError::invalid("daily_calories must not be negative"));
    }
    for (label, value) in [
        ("daily_carbs", targets.daily_carbs),
        ("daily_protein", targets.daily_protein),
        ("daily_fat", targets.daily_fat),
    ] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(TrackerError::invalid(format!(
                "{label} must be a non-negative number"
            )));
        }
    }
    Ok(())
}
