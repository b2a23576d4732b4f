use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fittrack_core::models::{DailyReport, MacroProgress};
use fittrack_core::service::TrackerService;

use super::helpers::{no_neg_zero, parse_date};

pub(crate) fn cmd_report(
    svc: &TrackerService,
    user: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let report = svc.daily_report(user, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &DailyReport) {
    #[derive(Tabled)]
    struct BreakdownRow {
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Entries")]
        entries: usize,
        #[tabled(rename = "Cal")]
        calories: i64,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let date = &report.date;
    let user = &report.user_id;
    println!("=== {date} ({user}) ===\n");

    if report.breakdown.is_empty() {
        println!("  No entries\n");
    } else {
        let rows: Vec<BreakdownRow> = report
            .breakdown
            .iter()
            .map(|b| BreakdownRow {
                meal: b.meal_type.to_uppercase(),
                entries: b.entry_count,
                calories: b.calories,
                carbs: format!("{:.1}g", b.carbs),
                protein: format!("{:.1}g", b.protein),
                fat: format!("{:.1}g", b.fat),
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{table}\n");
    }

    let t = &report.totals;
    println!(
        "  TOTAL: {} kcal | C:{:.1}g P:{:.1}g F:{:.1}g",
        t.total_calories, t.total_carbs, t.total_protein, t.total_fat
    );

    if report.goal.is_some() {
        let p = &report.progress;
        println!("  GOAL:  {}", progress_line("kcal", &p.calories));
        println!("         {}", progress_line("carbs", &p.carbs));
        println!("         {}", progress_line("protein", &p.protein));
        println!("         {}", progress_line("fat", &p.fat));
    } else {
        println!("  GOAL:  not set (use `fittrack goal set`)");
    }

    if let Some(split) = &report.macro_split {
        println!(
            "  SPLIT: carbs {}% | protein {}% | fat {}%",
            split.carbs_pct, split.protein_pct, split.fat_pct
        );
    }
}

fn progress_line(label: &str, progress: &MacroProgress) -> String {
    match progress.target {
        Some(target) => {
            let remaining = no_neg_zero(target - progress.current);
            format!(
                "{label}: {}% of {target:.0} ({remaining:.0} left, {:?})",
                progress.percent, progress.level
            )
        }
        None => format!("{label}: no target"),
    }
}
