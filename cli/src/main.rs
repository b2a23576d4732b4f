mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    MealArgs, cmd_bmi, cmd_food_add, cmd_food_search, cmd_goal_set, cmd_goal_show, cmd_meal_add,
    cmd_meal_delete, cmd_meal_list, cmd_meal_update, cmd_report,
};
use crate::config::Config;
use fittrack_core::models::{GoalTargets, NewFoodItem};
use fittrack_core::service::TrackerService;

#[derive(Parser)]
#[command(
    name = "fittrack",
    version,
    about = "Track meals, macro goals, and BMI from the terminal or over HTTP"
)]
struct Cli {
    /// User the entries belong to
    #[arg(short, long, global = true, default_value = "default")]
    user: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on (default: FITTRACK_PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to (default: FITTRACK_BIND or 127.0.0.1)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Manage the food catalog
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Log and edit meal entries
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Show the daily report (totals, breakdown, goal progress)
    Report {
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage daily macro goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Compute BMI and suggested calorie/macro targets
    Bmi {
        /// Body weight in kilograms
        #[arg(long)]
        weight: f64,
        /// Height in inches
        #[arg(long)]
        height: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a catalog food (values per serving)
    Add {
        /// Food name
        name: String,
        /// Calories per serving
        #[arg(long)]
        calories: i64,
        /// Carbs per serving (g)
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Protein per serving (g)
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Fat per serving (g)
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Serving description (e.g. "1 cup")
        #[arg(long)]
        serving: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the catalog by name
    Search {
        /// Search query (lists the catalog when omitted)
        query: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Log a meal from a catalog food or a custom name
    Add {
        /// Catalog food ID
        #[arg(long, conflicts_with = "custom")]
        food_id: Option<i64>,
        /// Custom entry name (no nutrition tracked)
        #[arg(long)]
        custom: Option<String>,
        /// Number of servings (default: 1)
        #[arg(short, long)]
        servings: Option<f64>,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date to log for (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List meals for a day
    List {
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update servings, meal type, or date of an entry
    Update {
        /// Entry ID to update
        entry_id: i64,
        /// New number of servings
        #[arg(short, long)]
        servings: Option<f64>,
        /// New meal type
        #[arg(long)]
        meal: Option<String>,
        /// New date
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal entry by ID
    Delete {
        /// Entry ID to delete
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Show the saved goal
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save daily targets; omitted values are cleared
    Set {
        /// Daily calories
        #[arg(long)]
        calories: Option<i64>,
        /// Daily carbs (g)
        #[arg(long)]
        carbs: Option<f64>,
        /// Daily protein (g)
        #[arg(long)]
        protein: Option<f64>,
        /// Daily fat (g)
        #[arg(long)]
        fat: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // One-shot commands stay quiet unless RUST_LOG asks otherwise
    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    init_tracing(default_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let user = cli.user.as_str();

    let svc = TrackerService::new(&config.db_path)?;

    match cli.command {
        Commands::Serve { port, bind } => {
            let port = port.unwrap_or(config.port);
            let bind = bind.unwrap_or(config.bind);
            server::start_server(svc, port, &bind).await
        }
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                carbs,
                protein,
                fat,
                serving,
                json,
            } => cmd_food_add(
                &svc,
                &NewFoodItem {
                    name,
                    serving_size: serving,
                    calories,
                    carbs,
                    protein,
                    fat,
                },
                json,
            ),
            FoodCommands::Search { query, json } => cmd_food_search(&svc, query.as_deref(), json),
        },
        Commands::Meal { command } => match command {
            MealCommands::Add {
                food_id,
                custom,
                servings,
                meal,
                date,
                json,
            } => cmd_meal_add(
                &svc,
                user,
                MealArgs {
                    food_id,
                    custom,
                    servings,
                    meal,
                    date,
                },
                json,
            ),
            MealCommands::List { date, json } => cmd_meal_list(&svc, user, date, json),
            MealCommands::Update {
                entry_id,
                servings,
                meal,
                date,
                json,
            } => cmd_meal_update(&svc, entry_id, servings, meal, date, json),
            MealCommands::Delete { entry_id, json } => cmd_meal_delete(&svc, entry_id, json),
        },
        Commands::Report { date, json } => cmd_report(&svc, user, date, json),
        Commands::Goal { command } => match command {
            GoalCommands::Show { json } => cmd_goal_show(&svc, user, json),
            GoalCommands::Set {
                calories,
                carbs,
                protein,
                fat,
                json,
            } => cmd_goal_set(
                &svc,
                user,
                &GoalTargets {
                    daily_calories: calories,
                    daily_carbs: carbs,
                    daily_protein: protein,
                    daily_fat: fat,
                },
                json,
            ),
        },
        Commands::Bmi {
            weight,
            height,
            json,
        } => cmd_bmi(weight, height, json),
    }
}
