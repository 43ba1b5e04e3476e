use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use menu_planner_lib::{PlanOptions, PlannerError};
use tracing_subscriber::EnvFilter;

/// menu-planner - constraint-based weekly menu scheduling
#[derive(Parser)]
#[command(name = "menu-planner")]
#[command(about = "Generates a weekly meal plan and shopping list from declarative data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the declarative data directory and report every violation
    ValidateData {
        /// Directory containing rules.yml, ingredients.yml, pantry.yml, recipes/
        data_dir: PathBuf,
    },
    /// Run the full pipeline and write plan.json and shopping_list.json
    GeneratePlan {
        /// Directory containing rules.yml, ingredients.yml, pantry.yml, recipes/
        data_dir: PathBuf,

        /// Directory the JSON artifacts are written to
        out_dir: PathBuf,

        /// Solver seed; the same seed and inputs reproduce identical output
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Wall-clock limit for the solve, in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), PlannerError> {
    match cli.command {
        Commands::ValidateData { data_dir } => {
            let summary = menu_planner_lib::validate_data(&data_dir)?;
            tracing::info!(
                ingredients = summary.ingredient_count,
                recipes = summary.recipe_count,
                variants = summary.variant_count,
                warnings = summary.warnings.len(),
                "catalog is valid"
            );
            Ok(())
        }
        Commands::GeneratePlan {
            data_dir,
            out_dir,
            seed,
            timeout,
        } => {
            let options = PlanOptions {
                seed,
                timeout: timeout.map(Duration::from_secs),
            };
            let artifacts = menu_planner_lib::generate_plan(&data_dir, &out_dir, &options)?;
            tracing::info!(
                plan = %artifacts.plan_path.display(),
                shopping_list = %artifacts.shopping_path.display(),
                "artifacts written"
            );
            Ok(())
        }
    }
}

fn exit_code_for(err: &PlannerError) -> ExitCode {
    match err {
        PlannerError::Validation(_) => ExitCode::from(2),
        PlannerError::Infeasible(_) => ExitCode::from(3),
        PlannerError::Timeout(_) => ExitCode::from(4),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            exit_code_for(&err)
        }
    }
}
