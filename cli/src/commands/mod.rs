mod bmi;
mod food;
mod goal;
mod helpers;
mod meal;
mod report;

pub(crate) use bmi::cmd_bmi;
pub(crate) use food::{cmd_food_add, cmd_food_search};
pub(crate) use goal::{cmd_goal_set, cmd_goal_show};
pub(crate) use meal::{MealArgs, cmd_meal_add, cmd_meal_delete, cmd_meal_list, cmd_meal_update};
pub(crate) use report::cmd_report;
