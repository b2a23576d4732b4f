use anyhow::Result;

use fittrack_core::estimator::BodyMetrics;

pub(crate) fn cmd_bmi(weight_kg: f64, height_in: f64, json: bool) -> Result<()> {
    let assessment = BodyMetrics::new(weight_kg, height_in)?.assess();

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    let m = &assessment.macros;
    let rec = &assessment.recommendation;
    println!("BMI: {:.1} ({})", assessment.bmi, assessment.message);
    println!(
        "Maintenance: {} kcal | Target: {} kcal",
        assessment.maintenance_calories, assessment.target_calories
    );
    println!(
        "Macros: protein {}g | carbs {}g | fat {}g",
        m.protein_g, m.carbs_g, m.fat_g
    );
    println!("\n{}\n{}", rec.title, rec.details);
    for tip in rec.tips {
        println!("  - {tip}");
    }
    Ok(())
}
