use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::bl::{portion_resolver, schedule_solver::ScheduleSolver, shopping_aggregator, slot_model::SlotModel, variant_expander};
use crate::data_types::{ShoppingList, WeeklyPlan};
use crate::error::PlannerError;
use crate::loader::{self, Diagnostic};
use crate::output;

/// Run parameters of `generate-plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Drives the deterministic variant shuffle; identical seed and inputs
    /// reproduce the artifacts byte for byte.
    pub seed: u64,
    /// Optional wall-clock bound for the solve.
    pub timeout: Option<Duration>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            timeout: None,
        }
    }
}

/// What `validate-data` reports on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    pub ingredient_count: usize,
    pub recipe_count: usize,
    pub variant_count: usize,
    pub warnings: Vec<Diagnostic>,
}

/// The outcome of a successful `generate-plan` run.
#[derive(Debug)]
pub struct GeneratedArtifacts {
    pub plan: WeeklyPlan,
    pub shopping_list: ShoppingList,
    pub plan_path: PathBuf,
    pub shopping_path: PathBuf,
}

fn log_warnings(warnings: &[Diagnostic]) {
    for warning in warnings {
        warn!(origin = %warning.origin, "{}", warning.message);
    }
}

/// Loads and fully validates the catalog, including the check that every
/// (day, meal) slot has at least one admissible variant.
pub fn validate_data(data_dir: &Path) -> Result<CatalogSummary, PlannerError> {
    let loaded = loader::load_catalog(data_dir)?;
    log_warnings(&loaded.warnings);

    let variants = variant_expander::expand_catalog(&loaded.catalog);
    let variant_count = variants.len();
    SlotModel::build(&loaded.catalog, variants, 0)?;

    Ok(CatalogSummary {
        ingredient_count: loaded.catalog.ingredients.len(),
        recipe_count: loaded.catalog.recipes.len(),
        variant_count,
        warnings: loaded.warnings,
    })
}

/// The whole pipeline: load, expand, encode, solve, resolve, aggregate,
/// write. Strictly sequential; each stage consumes the previous stage's
/// immutable output.
pub fn generate_plan(
    data_dir: &Path,
    out_dir: &Path,
    options: &PlanOptions,
) -> Result<GeneratedArtifacts, PlannerError> {
    let loaded = loader::load_catalog(data_dir)?;
    log_warnings(&loaded.warnings);
    let catalog = &loaded.catalog;

    let variants = variant_expander::expand_catalog(catalog);
    let model = SlotModel::build(catalog, variants, options.seed)?;
    let assignment = ScheduleSolver::new(&model).solve(options.timeout)?;
    let slots = portion_resolver::resolve_assignment(&model, &assignment)?;

    let shopping_list = shopping_aggregator::aggregate_shopping(catalog, &slots);
    let derived = shopping_aggregator::derive_counts(&slots);
    let plan = WeeklyPlan {
        seed: options.seed,
        slots,
        derived,
    };

    let plan_path = output::write_plan(out_dir, &plan)?;
    let shopping_path = output::write_shopping_list(out_dir, &shopping_list)?;
    info!(seed = options.seed, slots = plan.slots.len(), "weekly plan generated");

    Ok(GeneratedArtifacts {
        plan,
        shopping_list,
        plan_path,
        shopping_path,
    })
}
