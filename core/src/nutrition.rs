//! Pure arithmetic behind meal logging and daily reports.

use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    DailyTotals, GoalProgress, MEAL_TYPES, MacroProgress, MacroSplit, MealEntry,
    MealTypeBreakdown, Nutrition, ProgressLevel, UserGoal,
};

// 2^63, the first float past i64::MAX
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Round to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Per-serving facts multiplied out to `servings`. Calories round to an
/// integer, macros to one decimal.
///
/// Fails with `InvalidInput` when a scaled value cannot be stored.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn scale(facts: &Nutrition, servings: f64) -> TrackerResult<Nutrition> {
    let calories = (facts.calories as f64 * servings).round();
    let scaled = Nutrition {
        calories: calories as i64,
        carbs: round1(facts.carbs * servings),
        protein: round1(facts.protein * servings),
        fat: round1(facts.fat * servings),
    };

    let storable = calories.abs() < I64_BOUND
        && scaled.carbs.is_finite()
        && scaled.protein.is_finite()
        && scaled.fat.is_finite();
    if !storable {
        return Err(TrackerError::invalid(format!("servings of {servings} is too large")));
    }
    Ok(scaled)
}

#[derive(Default)]
struct Sums {
    count: usize,
    calories: i64,
    carbs: f64,
    protein: f64,
    fat: f64,
}

impl Sums {
    fn add(&mut self, entry: &MealEntry) {
        self.count += 1;
        self.calories = self.calories.saturating_add(entry.calories.unwrap_or(0));
        self.carbs += entry.carbs.unwrap_or(0.0);
        self.protein += entry.protein.unwrap_or(0.0);
        self.fat += entry.fat.unwrap_or(0.0);
    }
}

/// Day totals plus one group per meal type that has entries.
///
/// Groups follow breakfast, lunch, dinner, snack. Null nutrition counts as
/// zero but still places the entry in its group.
#[must_use]
pub fn aggregate(entries: &[MealEntry]) -> (DailyTotals, Vec<MealTypeBreakdown>) {
    let mut day = Sums::default();
    let mut groups: Vec<(&str, Sums)> = MEAL_TYPES
        .iter()
        .map(|mt| (*mt, Sums::default()))
        .collect();

    for entry in entries {
        day.add(entry);
        if let Some((_, sums)) = groups.iter_mut().find(|(mt, _)| *mt == entry.meal_type) {
            sums.add(entry);
        }
    }

    let totals = DailyTotals {
        total_calories: day.calories,
        total_carbs: round1(day.carbs),
        total_protein: round1(day.protein),
        total_fat: round1(day.fat),
    };
    let breakdown = groups
        .into_iter()
        .filter(|(_, sums)| sums.count > 0)
        .map(|(meal_type, sums)| MealTypeBreakdown {
            meal_type: meal_type.to_string(),
            entry_count: sums.count,
            calories: sums.calories,
            carbs: round1(sums.carbs),
            protein: round1(sums.protein),
            fat: round1(sums.fat),
        })
        .collect();

    (totals, breakdown)
}

/// Percentage of `target` reached, capped at 100. Zero when there is no
/// positive target.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn progress_percent(current: f64, target: Option<f64>) -> i64 {
    match target {
        Some(t) if t > 0.0 => (current / t * 100.0).min(100.0).round() as i64,
        _ => 0,
    }
}

impl ProgressLevel {
    #[must_use]
    pub fn from_percent(percent: i64) -> Self {
        if percent < 50 {
            Self::Low
        } else if percent < 80 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

fn macro_progress(current: f64, target: Option<f64>) -> MacroProgress {
    let percent = progress_percent(current, target);
    MacroProgress {
        current,
        target,
        percent,
        level: ProgressLevel::from_percent(percent),
    }
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn goal_progress(totals: &DailyTotals, goal: Option<&UserGoal>) -> GoalProgress {
    GoalProgress {
        calories: macro_progress(
            totals.total_calories as f64,
            goal.and_then(|g| g.daily_calories).map(|c| c as f64),
        ),
        carbs: macro_progress(totals.total_carbs, goal.and_then(|g| g.daily_carbs)),
        protein: macro_progress(totals.total_protein, goal.and_then(|g| g.daily_protein)),
        fat: macro_progress(totals.total_fat, goal.and_then(|g| g.daily_fat)),
    }
}

/// Share of each macro in the day's macro grams. `None` on an empty day.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn macro_split(totals: &DailyTotals) -> Option<MacroSplit> {
    let grams = totals.total_carbs + totals.total_protein + totals.total_fat;
    if grams <= 0.0 {
        return None;
    }
    let pct = |v: f64| (v / grams * 100.0).round() as i64;
    Some(MacroSplit {
        carbs_pct: pct(totals.total_carbs),
        protein_pct: pct(totals.total_protein),
        fat_pct: pct(totals.total_fat),
    })
}
