use anyhow::Result;
use std::process;

use fittrack_core::error::TrackerError;
use fittrack_core::models::{MealSource, MealUpdate};
use fittrack_core::service::TrackerService;

use super::helpers::{format_servings, json_error, parse_date, print_meal_table};

pub(crate) struct MealArgs {
    pub food_id: Option<i64>,
    pub custom: Option<String>,
    pub servings: Option<f64>,
    pub meal: String,
    pub date: Option<String>,
}

pub(crate) fn cmd_meal_add(
    svc: &TrackerService,
    user: &str,
    args: MealArgs,
    json: bool,
) -> Result<()> {
    let source = MealSource::from_parts(args.food_id, args.custom.as_deref())?;
    let date = parse_date(args.date)?;
    let entry = svc.create_meal(user, source, args.servings, &args.meal, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let name = entry.display_name();
    let id = entry.id;
    let meal = &entry.meal_type;
    let date = &entry.date;
    let servings = format_servings(entry.servings);
    match entry.calories {
        Some(cal) => println!("Logged [{id}] {name} x{servings} to {meal} on {date} ({cal} kcal)"),
        None => println!("Logged [{id}] {name} to {meal} on {date} (no nutrition data)"),
    }
    Ok(())
}

pub(crate) fn cmd_meal_list(
    svc: &TrackerService,
    user: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let meals = svc.list_meals(user, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meals)?);
        return Ok(());
    }

    if meals.is_empty() {
        eprintln!("No entries for {}", date.format("%Y-%m-%d"));
        process::exit(2);
    }
    print_meal_table(&meals);
    Ok(())
}

pub(crate) fn cmd_meal_update(
    svc: &TrackerService,
    entry_id: i64,
    servings: Option<f64>,
    meal: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let update = MealUpdate {
        servings,
        meal_type: meal,
        date: date.map(Some).map(parse_date).transpose()?,
    };

    match svc.update_meal(entry_id, &update) {
        Ok(entry) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                println!("Updated entry {entry_id}");
            }
            Ok(())
        }
        Err(TrackerError::NotFound(msg)) => {
            if json {
                println!("{}", json_error(&msg));
            } else {
                eprintln!("{msg}");
            }
            process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn cmd_meal_delete(svc: &TrackerService, entry_id: i64, json: bool) -> Result<()> {
    match svc.delete_meal(entry_id) {
        Ok(()) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": entry_id }));
            } else {
                println!("Deleted entry {entry_id}");
            }
            Ok(())
        }
        Err(TrackerError::NotFound(msg)) => {
            if json {
                println!("{}", json_error(&msg));
            } else {
                eprintln!("{msg}");
            }
            process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}
