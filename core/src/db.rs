use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{
    DATE_FORMAT, FoodItem, GoalTargets, MealEntry, MealSource, NewFoodItem, NewMealEntry,
    Nutrition, UserGoal,
};

pub const SEARCH_LIMIT: i64 = 50;

const MEAL_COLUMNS: &str = "me.id, me.user_id, me.date, me.meal_type, me.food_id, me.custom_name,
        me.servings, me.calories, me.carbs, me.protein, me.fat, me.created_at, me.updated_at,
        f.name, f.serving_size
     FROM meal_entries me
     LEFT JOIN food_items f ON me.food_id = f.id";

const MEAL_ORDER: &str = "ORDER BY CASE me.meal_type
        WHEN 'breakfast' THEN 0 WHEN 'lunch' THEN 1 WHEN 'dinner' THEN 2 WHEN 'snack' THEN 3
        END, me.created_at, me.id";

/// Replacement values for every mutable column of a meal entry.
#[derive(Debug, Clone)]
pub struct MealRow<'a> {
    pub servings: f64,
    pub meal_type: &'a str,
    pub date: NaiveDate,
    pub nutrition: Option<Nutrition>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn
                .execute_batch(
                    "CREATE TABLE IF NOT EXISTS food_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    serving_size TEXT,
                    calories INTEGER NOT NULL,
                    carbs REAL NOT NULL DEFAULT 0,
                    protein REAL NOT NULL DEFAULT 0,
                    fat REAL NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    food_id INTEGER REFERENCES food_items(id),
                    custom_name TEXT,
                    servings REAL NOT NULL DEFAULT 1.0,
                    meal_type TEXT NOT NULL
                        CHECK (meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
                    date TEXT NOT NULL,
                    calories INTEGER,
                    carbs REAL,
                    protein REAL,
                    fat REAL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    CHECK (food_id IS NOT NULL OR custom_name IS NOT NULL)
                );

                CREATE TABLE IF NOT EXISTS user_goals (
                    user_id TEXT PRIMARY KEY NOT NULL,
                    daily_calories INTEGER,
                    daily_carbs REAL,
                    daily_protein REAL,
                    daily_fat REAL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_meal_entries_user_date
                    ON meal_entries(user_id, date);
                CREATE INDEX IF NOT EXISTS idx_food_items_name ON food_items(name);

                PRAGMA user_version = 1;",
                )
                .context("Failed to create schema")?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodItem> {
        Ok(FoodItem {
            id: row.get(0)?,
            name: row.get(1)?,
            serving_size: row.get(2)?,
            calories: row.get(3)?,
            carbs: row.get(4)?,
            protein: row.get(5)?,
            fat: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    // Expects the columns of MEAL_COLUMNS in order
    fn meal_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealEntry> {
        let food_id: Option<i64> = row.get(4)?;
        let custom_name: Option<String> = row.get(5)?;
        let source = match food_id {
            Some(food_id) => MealSource::Food { food_id },
            None => MealSource::Custom {
                name: custom_name.unwrap_or_default(),
            },
        };
        Ok(MealEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: row.get(2)?,
            meal_type: row.get(3)?,
            source,
            servings: row.get(6)?,
            calories: row.get(7)?,
            carbs: row.get(8)?,
            protein: row.get(9)?,
            fat: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            food_name: row.get(13)?,
            serving_size: row.get(14)?,
        })
    }

    fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserGoal> {
        Ok(UserGoal {
            user_id: row.get(0)?,
            daily_calories: row.get(1)?,
            daily_carbs: row.get(2)?,
            daily_protein: row.get(3)?,
            daily_fat: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Food catalog ---

    pub fn insert_food(&self, food: &NewFoodItem) -> Result<FoodItem> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO food_items
                    (name, serving_size, calories, carbs, protein, fat, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    food.name.trim(),
                    food.serving_size,
                    food.calories,
                    food.carbs,
                    food.protein,
                    food.fat,
                    now,
                ],
            )
            .context("Failed to insert food")?;
        let id = self.conn.last_insert_rowid();
        self.get_food_by_id(id)?.context("Food missing after insert")
    }

    pub fn get_food_by_id(&self, id: i64) -> Result<Option<FoodItem>> {
        self.conn
            .query_row(
                "SELECT id, name, serving_size, calories, carbs, protein, fat, created_at
                 FROM food_items WHERE id = ?1",
                params![id],
                Self::food_from_row,
            )
            .optional()
            .context("Failed to look up food")
    }

    /// Case-insensitive substring match on name. An empty query lists the
    /// first foods by name.
    pub fn search_foods(&self, query: &str) -> Result<Vec<FoodItem>> {
        let escaped = query
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(
            "SELECT id, name, serving_size, calories, carbs, protein, fat, created_at
             FROM food_items WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name, id LIMIT ?2",
        )?;
        let foods = stmt
            .query_map(params![pattern, SEARCH_LIMIT], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to search foods")?;
        Ok(foods)
    }

    // --- Meal entries ---

    pub fn insert_meal_entry(&self, entry: &NewMealEntry) -> Result<MealEntry> {
        let now = Local::now().to_rfc3339();
        let date_str = entry.date.format(DATE_FORMAT).to_string();
        let nutrition = entry.nutrition;
        self.conn
            .execute(
                "INSERT INTO meal_entries (user_id, food_id, custom_name, servings, meal_type, date,
                                       calories, carbs, protein, fat, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    entry.user_id,
                    entry.source.food_id(),
                    entry.source.custom_name(),
                    entry.servings,
                    entry.meal_type,
                    date_str,
                    nutrition.map(|n| n.calories),
                    nutrition.map(|n| n.carbs),
                    nutrition.map(|n| n.protein),
                    nutrition.map(|n| n.fat),
                    now,
                    now,
                ],
            )
            .context("Failed to insert meal entry")?;
        let id = self.conn.last_insert_rowid();
        self.get_meal_entry(id)?
            .context("Meal entry missing after insert")
    }

    pub fn get_meal_entry(&self, id: i64) -> Result<Option<MealEntry>> {
        self.conn
            .query_row(
                &format!("SELECT {MEAL_COLUMNS} WHERE me.id = ?1"),
                params![id],
                Self::meal_entry_from_row,
            )
            .optional()
            .context("Failed to look up meal entry")
    }

    pub fn list_meals(&self, user_id: &str, date: NaiveDate) -> Result<Vec<MealEntry>> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEAL_COLUMNS} WHERE me.user_id = ?1 AND me.date = ?2 {MEAL_ORDER}"
        ))?;
        let entries = stmt
            .query_map(params![user_id, date_str], Self::meal_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list meal entries")?;
        Ok(entries)
    }

    /// Overwrite the mutable columns of one entry. Returns `None` when the id
    /// does not exist.
    pub fn update_meal_entry(&self, id: i64, row: &MealRow<'_>) -> Result<Option<MealEntry>> {
        let now = Local::now().to_rfc3339();
        let date_str = row.date.format(DATE_FORMAT).to_string();
        let nutrition = row.nutrition;
        let changed = self
            .conn
            .execute(
                "UPDATE meal_entries
                 SET servings = ?1, meal_type = ?2, date = ?3,
                     calories = ?4, carbs = ?5, protein = ?6, fat = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    row.servings,
                    row.meal_type,
                    date_str,
                    nutrition.map(|n| n.calories),
                    nutrition.map(|n| n.carbs),
                    nutrition.map(|n| n.protein),
                    nutrition.map(|n| n.fat),
                    now,
                    id,
                ],
            )
            .context("Failed to update meal entry")?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_meal_entry(id)
    }

    pub fn delete_meal_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_entries WHERE id = ?1", params![id])
            .context("Failed to delete meal entry")?;
        Ok(rows > 0)
    }

    // --- Goals ---

    pub fn get_goal(&self, user_id: &str) -> Result<Option<UserGoal>> {
        self.conn
            .query_row(
                "SELECT user_id, daily_calories, daily_carbs, daily_protein, daily_fat,
                        created_at, updated_at
                 FROM user_goals WHERE user_id = ?1",
                params![user_id],
                Self::goal_from_row,
            )
            .optional()
            .context("Failed to look up goal")
    }

    /// Insert or overwrite all four targets for the user in one statement.
    pub fn upsert_goal(&self, user_id: &str, targets: &GoalTargets) -> Result<UserGoal> {
        let now = Local::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO user_goals
                    (user_id, daily_calories, daily_carbs, daily_protein, daily_fat,
                     created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                 daily_calories = excluded.daily_calories,
                 daily_carbs = excluded.daily_carbs,
                 daily_protein = excluded.daily_protein,
                 daily_fat = excluded.daily_fat,
                 updated_at = excluded.updated_at",
                params![
                    user_id,
                    targets.daily_calories,
                    targets.daily_carbs,
                    targets.daily_protein,
                    targets.daily_fat,
                    now,
                ],
            )
            .context("Failed to save goal")?;
        self.get_goal(user_id)?.context("Goal missing after save")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oatmeal() -> NewFoodItem {
        NewFoodItem {
            name: "Oatmeal".to_string(),
            serving_size: Some("1 cup".to_string()),
            calories: 150,
            carbs: 27.0,
            protein: 5.0,
            fat: 3.0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn new_entry(user: &str, meal_type: &str, source: MealSource, date: NaiveDate) -> NewMealEntry {
        let nutrition = match source {
            MealSource::Food { .. } => Some(Nutrition {
                calories: 150,
                carbs: 27.0,
                protein: 5.0,
                fat: 3.0,
            }),
            MealSource::Custom { .. } => None,
        };
        NewMealEntry {
            user_id: user.to_string(),
            date,
            meal_type: meal_type.to_string(),
            source,
            servings: 1.0,
            nutrition,
        }
    }

    #[test]
    fn test_insert_and_get_food() {
        let db = Database::open_in_memory().unwrap();
        let food = db.insert_food(&oatmeal()).unwrap();
        assert_eq!(food.name, "Oatmeal");
        assert_eq!(food.serving_size.as_deref(), Some("1 cup"));
        assert_eq!(food.calories, 150);

        let fetched = db.get_food_by_id(food.id).unwrap().unwrap();
        assert_eq!(fetched.name, food.name);
        assert!(db.get_food_by_id(9999).unwrap().is_none());
    }

    #[test]
    fn test_search_foods_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_food(&oatmeal()).unwrap();
        let mut banana = oatmeal();
        banana.name = "Banana".to_string();
        db.insert_food(&banana).unwrap();

        let results = db.search_foods("OAT").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Oatmeal");

        let all = db.search_foods("").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Banana");
    }

    #[test]
    fn test_search_foods_escapes_wildcards() {
        let db = Database::open_in_memory().unwrap();
        db.insert_food(&oatmeal()).unwrap();
        assert!(db.search_foods("%").unwrap().is_empty());
        assert!(db.search_foods("_").unwrap().is_empty());
    }

    #[test]
    fn test_search_foods_limit() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..60 {
            let mut food = oatmeal();
            food.name = format!("Food {i:02}");
            db.insert_food(&food).unwrap();
        }
        let results = db.search_foods("food").unwrap();
        assert_eq!(results.len(), 50);
    }

    #[test]
    fn test_insert_and_get_meal_entry() {
        let db = Database::open_in_memory().unwrap();
        let food = db.insert_food(&oatmeal()).unwrap();
        let entry = db
            .insert_meal_entry(&new_entry(
                "u1",
                "breakfast",
                MealSource::Food { food_id: food.id },
                day(1),
            ))
            .unwrap();

        assert_eq!(entry.user_id, "u1");
        assert_eq!(entry.date, "2024-01-01");
        assert_eq!(entry.source, MealSource::Food { food_id: food.id });
        assert_eq!(entry.calories, Some(150));
        assert_eq!(entry.food_name.as_deref(), Some("Oatmeal"));
        assert_eq!(entry.serving_size.as_deref(), Some("1 cup"));
    }

    #[test]
    fn test_custom_entry_has_null_nutrition() {
        let db = Database::open_in_memory().unwrap();
        let entry = db
            .insert_meal_entry(&new_entry(
                "u1",
                "lunch",
                MealSource::Custom {
                    name: "Leftovers".to_string(),
                },
                day(1),
            ))
            .unwrap();
        assert_eq!(
            entry.source,
            MealSource::Custom {
                name: "Leftovers".to_string()
            }
        );
        assert!(entry.calories.is_none());
        assert!(entry.fat.is_none());
        assert!(entry.food_name.is_none());
        assert_eq!(entry.display_name(), "Leftovers");
    }

    #[test]
    fn test_unknown_food_reference_rejected() {
        let db = Database::open_in_memory().unwrap();
        let result = db.insert_meal_entry(&new_entry(
            "u1",
            "lunch",
            MealSource::Food { food_id: 42 },
            day(1),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_meal_type_outside_known_set_rejected() {
        let db = Database::open_in_memory().unwrap();
        let result = db.insert_meal_entry(&new_entry(
            "u1",
            "brunch",
            MealSource::Custom {
                name: "Pancakes".to_string(),
            },
            day(1),
        ));
        assert!(result.is_err());
        assert!(db.list_meals("u1", day(1)).unwrap().is_empty());
    }

    #[test]
    fn test_list_meals_filters_and_orders() {
        let db = Database::open_in_memory().unwrap();
        let food = db.insert_food(&oatmeal()).unwrap();
        let src = MealSource::Food { food_id: food.id };
        db.insert_meal_entry(&new_entry("u1", "snack", src.clone(), day(1)))
            .unwrap();
        db.insert_meal_entry(&new_entry("u1", "breakfast", src.clone(), day(1)))
            .unwrap();
        db.insert_meal_entry(&new_entry("u1", "dinner", src.clone(), day(1)))
            .unwrap();
        db.insert_meal_entry(&new_entry("u2", "lunch", src.clone(), day(1)))
            .unwrap();
        db.insert_meal_entry(&new_entry("u1", "lunch", src, day(2)))
            .unwrap();

        let meals = db.list_meals("u1", day(1)).unwrap();
        let types: Vec<&str> = meals.iter().map(|m| m.meal_type.as_str()).collect();
        assert_eq!(types, vec!["breakfast", "dinner", "snack"]);

        assert_eq!(db.list_meals("u2", day(1)).unwrap().len(), 1);
        assert!(db.list_meals("u3", day(1)).unwrap().is_empty());
    }

    #[test]
    fn test_update_meal_entry() {
        let db = Database::open_in_memory().unwrap();
        let food = db.insert_food(&oatmeal()).unwrap();
        let entry = db
            .insert_meal_entry(&new_entry(
                "u1",
                "breakfast",
                MealSource::Food { food_id: food.id },
                day(1),
            ))
            .unwrap();

        let updated = db
            .update_meal_entry(
                entry.id,
                &MealRow {
                    servings: 2.0,
                    meal_type: "lunch",
                    date: day(2),
                    nutrition: Some(Nutrition {
                        calories: 300,
                        carbs: 54.0,
                        protein: 10.0,
                        fat: 6.0,
                    }),
                },
            )
            .unwrap()
            .unwrap();
        assert!((updated.servings - 2.0).abs() < f64::EPSILON);
        assert_eq!(updated.meal_type, "lunch");
        assert_eq!(updated.date, "2024-01-02");
        assert_eq!(updated.calories, Some(300));
        assert_eq!(updated.created_at, entry.created_at);
    }

    #[test]
    fn test_update_meal_entry_not_found() {
        let db = Database::open_in_memory().unwrap();
        let row = MealRow {
            servings: 1.0,
            meal_type: "lunch",
            date: day(1),
            nutrition: None,
        };
        assert!(db.update_meal_entry(999, &row).unwrap().is_none());
    }

    #[test]
    fn test_delete_meal_entry() {
        let db = Database::open_in_memory().unwrap();
        let entry = db
            .insert_meal_entry(&new_entry(
                "u1",
                "snack",
                MealSource::Custom {
                    name: "Apple".to_string(),
                },
                day(1),
            ))
            .unwrap();
        assert!(db.delete_meal_entry(entry.id).unwrap());
        assert!(!db.delete_meal_entry(entry.id).unwrap());
        assert!(db.get_meal_entry(entry.id).unwrap().is_none());
    }

    #[test]
    fn test_goal_absent_then_upserted() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_goal("u1").unwrap().is_none());

        let targets = GoalTargets {
            daily_calories: Some(2000),
            daily_carbs: Some(250.0),
            daily_protein: Some(150.0),
            daily_fat: Some(65.0),
        };
        let goal = db.upsert_goal("u1", &targets).unwrap();
        assert_eq!(goal.targets(), targets);
        assert_eq!(goal.created_at, goal.updated_at);
    }

    #[test]
    fn test_goal_upsert_overwrites_all_fields() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .upsert_goal(
                "u1",
                &GoalTargets {
                    daily_calories: Some(2000),
                    daily_carbs: Some(250.0),
                    daily_protein: Some(150.0),
                    daily_fat: Some(65.0),
                },
            )
            .unwrap();

        let partial = GoalTargets {
            daily_calories: Some(1800),
            ..GoalTargets::default()
        };
        let second = db.upsert_goal("u1", &partial).unwrap();
        assert_eq!(second.targets(), partial);
        assert!(second.daily_carbs.is_none());
        assert_eq!(second.created_at, first.created_at);

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM user_goals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fittrack.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_food(&oatmeal()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.search_foods("oat").unwrap().len(), 1);
    }
}
