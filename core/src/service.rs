use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::db::{Database, MealRow};
use crate::error::{TrackerError, TrackerResult, require_param};
use crate::models::{
    DATE_FORMAT, DailyReport, FoodItem, GoalTargets, MealEntry, MealSource, MealUpdate,
    NewFoodItem, NewMealEntry, Nutrition, UserGoal, parse_date, resolve_servings, validate_food,
    validate_goal_targets, validate_meal_type, validate_servings,
};
use crate::nutrition;

/// Operations behind every tracker surface. Callers resolve "today" and pass
/// explicit dates.
pub struct TrackerService {
    db: Database,
}

impl TrackerService {
    pub fn new(db_path: &Path) -> TrackerResult<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> TrackerResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Food catalog ---

    pub fn search_foods(&self, query: Option<&str>) -> TrackerResult<Vec<FoodItem>> {
        Ok(self.db.search_foods(query.unwrap_or_default())?)
    }

    pub fn add_food(&self, food: &NewFoodItem) -> TrackerResult<FoodItem> {
        validate_food(food)?;
        let food = self.db.insert_food(food)?;
        info!(food_id = food.id, name = %food.name, "added food");
        Ok(food)
    }

    // --- Meals ---

    /// Log a meal. Food-referenced entries get nutrition scaled from the
    /// catalog; custom entries store none.
    pub fn create_meal(
        &self,
        user_id: &str,
        source: MealSource,
        servings: Option<f64>,
        meal_type: &str,
        date: NaiveDate,
    ) -> TrackerResult<MealEntry> {
        let user_id = require_param(Some(user_id), "user_id")?;
        let meal_type = validate_meal_type(meal_type)?;
        let servings = resolve_servings(servings)?;

        let nutrition = match &source {
            MealSource::Food { food_id } => {
                let food = self.db.get_food_by_id(*food_id)?.ok_or_else(|| {
                    TrackerError::not_found(format!("Food item {food_id} not found"))
                })?;
                Some(nutrition::scale(&food.facts(), servings)?)
            }
            MealSource::Custom { .. } => None,
        };

        let entry = self.db.insert_meal_entry(&NewMealEntry {
            user_id: user_id.to_string(),
            date,
            meal_type,
            source,
            servings,
            nutrition,
        })?;
        info!(
            meal_id = entry.id,
            user_id = %entry.user_id,
            date = %entry.date,
            meal_type = %entry.meal_type,
            "logged meal"
        );
        Ok(entry)
    }

    pub fn list_meals(&self, user_id: &str, date: NaiveDate) -> TrackerResult<Vec<MealEntry>> {
        let user_id = require_param(Some(user_id), "user_id")?;
        Ok(self.db.list_meals(user_id, date)?)
    }

    /// Change servings, meal type or date. Changing servings on a food entry
    /// rescales its nutrition from the catalog.
    pub fn update_meal(&self, id: i64, update: &MealUpdate) -> TrackerResult<MealEntry> {
        if update.is_empty() {
            return Err(TrackerError::invalid(
                "Nothing to update. Provide servings, meal_type or date",
            ));
        }
        let existing = self
            .db
            .get_meal_entry(id)?
            .ok_or_else(|| TrackerError::not_found(format!("Meal entry {id} not found")))?;

        let meal_type = match &update.meal_type {
            Some(mt) => validate_meal_type(mt)?,
            None => existing.meal_type.clone(),
        };
        let date = match update.date {
            Some(d) => d,
            None => parse_date(&existing.date)?,
        };
        let servings = match update.servings {
            Some(s) => validate_servings(s)?,
            None => existing.servings,
        };

        let nutrition = match (&existing.source, update.servings) {
            (MealSource::Food { food_id }, Some(_)) => {
                let food = self.db.get_food_by_id(*food_id)?.ok_or_else(|| {
                    TrackerError::not_found(format!("Food item {food_id} not found"))
                })?;
                Some(nutrition::scale(&food.facts(), servings)?)
            }
            _ => match (existing.calories, existing.carbs, existing.protein, existing.fat) {
                (Some(calories), Some(carbs), Some(protein), Some(fat)) => Some(Nutrition {
                    calories,
                    carbs,
                    protein,
                    fat,
                }),
                _ => None,
            },
        };

        let updated = self
            .db
            .update_meal_entry(
                id,
                &MealRow {
                    servings,
                    meal_type: &meal_type,
                    date,
                    nutrition,
                },
            )?
            .ok_or_else(|| TrackerError::not_found(format!("Meal entry {id} not found")))?;
        info!(meal_id = id, "updated meal");
        Ok(updated)
    }

    pub fn delete_meal(&self, id: i64) -> TrackerResult<()> {
        if !self.db.delete_meal_entry(id)? {
            return Err(TrackerError::not_found(format!("Meal entry {id} not found")));
        }
        info!(meal_id = id, "deleted meal");
        Ok(())
    }

    // --- Reports ---

    pub fn daily_report(&self, user_id: &str, date: NaiveDate) -> TrackerResult<DailyReport> {
        let user_id = require_param(Some(user_id), "user_id")?;
        let entries = self.db.list_meals(user_id, date)?;
        let goal = self.db.get_goal(user_id)?;

        let (totals, breakdown) = nutrition::aggregate(&entries);
        let progress = nutrition::goal_progress(&totals, goal.as_ref());
        let macro_split = nutrition::macro_split(&totals);
        debug!(user_id, entries = entries.len(), "built daily report");

        Ok(DailyReport {
            user_id: user_id.to_string(),
            date: date.format(DATE_FORMAT).to_string(),
            totals,
            goal,
            progress,
            macro_split,
            breakdown,
        })
    }

    // --- Goals ---

    pub fn get_goal(&self, user_id: &str) -> TrackerResult<Option<UserGoal>> {
        let user_id = require_param(Some(user_id), "user_id")?;
        Ok(self.db.get_goal(user_id)?)
    }

    pub fn set_goal(&self, user_id: &str, targets: &GoalTargets) -> TrackerResult<UserGoal> {
        let user_id = require_param(Some(user_id), "user_id")?;
        validate_goal_targets(targets)?;
        let goal = self.db.upsert_goal(user_id, targets)?;
        info!(user_id, "saved goal");
        Ok(goal)
    }
}
