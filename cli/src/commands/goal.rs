use anyhow::Result;
use std::process;

use fittrack_core::models::GoalTargets;
use fittrack_core::service::TrackerService;

pub(crate) fn cmd_goal_show(svc: &TrackerService, user: &str, json: bool) -> Result<()> {
    let goal = svc.get_goal(user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goal)?);
        return Ok(());
    }

    let Some(goal) = goal else {
        eprintln!("No goal set for {user}");
        process::exit(2);
    };

    let fmt_g = |v: Option<f64>| v.map_or("-".to_string(), |g| format!("{g:.0}g"));
    println!("Daily goal for {}:", goal.user_id);
    let calories = goal
        .daily_calories
        .map_or("-".to_string(), |c| format!("{c} kcal"));
    println!("  Calories: {calories}");
    println!("  Carbs:    {}", fmt_g(goal.daily_carbs));
    println!("  Protein:  {}", fmt_g(goal.daily_protein));
    println!("  Fat:      {}", fmt_g(goal.daily_fat));
    println!("  Updated:  {}", goal.updated_at);
    Ok(())
}

pub(crate) fn cmd_goal_set(
    svc: &TrackerService,
    user: &str,
    targets: &GoalTargets,
    json: bool,
) -> Result<()> {
    let goal = svc.set_goal(user, targets)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goal)?);
    } else {
        println!("Saved goal for {}", goal.user_id);
    }
    Ok(())
}
