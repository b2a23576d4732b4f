use anyhow::Result;
use std::process;

use fittrack_core::models::NewFoodItem;
use fittrack_core::service::TrackerService;

use super::helpers::print_food_table;

pub(crate) fn cmd_food_add(svc: &TrackerService, food: &NewFoodItem, json: bool) -> Result<()> {
    let food = svc.add_food(food)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        let name = &food.name;
        let id = food.id;
        println!("Added food: {name} (id: {id})");
    }

    Ok(())
}

pub(crate) fn cmd_food_search(svc: &TrackerService, query: Option<&str>, json: bool) -> Result<()> {
    let foods = svc.search_foods(query)?;

    if foods.is_empty() {
        if json {
            println!("[]");
        } else {
            match query {
                Some(q) => eprintln!("No foods found for '{q}'"),
                None => eprintln!("No foods in the catalog"),
            }
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else {
        print_food_table(&foods);
    }

    Ok(())
}
