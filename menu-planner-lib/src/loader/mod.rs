mod diagnostics;
mod schema;
mod validate;

pub use diagnostics::{Diagnostic, DiagnosticSink, Severity, ValidationReport};
pub use schema::PORTION_TOKEN;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::data_types::{Catalog, Recipe};
use crate::error::PlannerError;
use schema::{IngredientsFile, PantryFile, RawRecipe, convert_recipe};

/// A validated catalog together with the non-fatal findings (currently only
/// fractional carb-cap warnings) produced while loading it.
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub warnings: Vec<Diagnostic>,
}

/// Reads and validates the four declarative inputs under `data_dir`.
///
/// All schema, referential, and invariant violations found in one pass are
/// aggregated into a single [`ValidationReport`]; the function only returns a
/// catalog when the report would be empty of errors.
pub fn load_catalog(data_dir: &Path) -> Result<LoadedCatalog, PlannerError> {
    let mut sink = DiagnosticSink::new();

    let rules = read_yaml::<crate::data_types::Rules>(data_dir, "rules.yml", &mut sink);
    let ingredients_file = read_yaml::<IngredientsFile>(data_dir, "ingredients.yml", &mut sink);
    let pantry_file = read_yaml::<PantryFile>(data_dir, "pantry.yml", &mut sink);
    let raw_recipes = read_recipes(data_dir, &mut sink);

    let ingredients = ingredients_file
        .map(|file| file.ingredients)
        .unwrap_or_default();
    let by_id = validate::validate_ingredients(&ingredients, &mut sink);

    if let Some(pantry) = &pantry_file {
        validate::validate_pantry(&pantry.items, &by_id, &mut sink);
    }

    let mut recipes: Vec<(String, Recipe)> = Vec::new();
    for (origin, raw) in raw_recipes {
        if let Some(recipe) = convert_recipe(raw, &origin, &mut sink) {
            recipes.push((origin, recipe));
        }
    }

    if let Some(rules) = &rules {
        validate::validate_rules(rules, &by_id, &mut sink);
        validate::validate_recipes(&recipes, rules, &by_id, &mut sink);
    }

    if sink.has_errors() {
        return Err(PlannerError::Validation(sink.into_report()));
    }
    let Some(rules) = rules else {
        // Unreachable: a missing or unparsable rules file is an error above.
        return Err(PlannerError::Internal(
            "rules absent from an error-free load".to_string(),
        ));
    };

    let warnings = sink.warnings();
    let mut recipes: Vec<Recipe> = recipes.into_iter().map(|(_, recipe)| recipe).collect();
    recipes.sort_by(|a, b| a.id.cmp(&b.id));

    let pantry: BTreeSet<String> = pantry_file
        .map(|file| file.items.into_iter().collect())
        .unwrap_or_default();

    info!(
        ingredients = by_id.len(),
        recipes = recipes.len(),
        pantry = pantry.len(),
        warnings = warnings.len(),
        "catalog loaded"
    );

    Ok(LoadedCatalog {
        catalog: Catalog {
            rules,
            ingredients: by_id,
            pantry,
            recipes,
        },
        warnings,
    })
}

fn read_yaml<T: DeserializeOwned>(
    data_dir: &Path,
    file_name: &str,
    sink: &mut DiagnosticSink,
) -> Option<T> {
    let path = data_dir.join(file_name);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            sink.error(file_name, format!("cannot read {}: {err}", path.display()));
            return None;
        }
    };
    match serde_yaml::from_str(&text) {
        Ok(value) => {
            debug!(file = file_name, "parsed input file");
            Some(value)
        }
        Err(err) => {
            sink.error(file_name, format!("invalid schema: {err}"));
            None
        }
    }
}

fn read_recipes(data_dir: &Path, sink: &mut DiagnosticSink) -> Vec<(String, RawRecipe)> {
    let recipes_dir = data_dir.join("recipes");
    let entries = match fs::read_dir(&recipes_dir) {
        Ok(entries) => entries,
        Err(err) => {
            sink.error(
                "recipes",
                format!("cannot read {}: {err}", recipes_dir.display()),
            );
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "yml"))
        .collect();
    paths.sort();

    let mut recipes = Vec::with_capacity(paths.len());
    for path in paths {
        let origin = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |name| {
                format!("recipes/{}", name.to_string_lossy())
            });
        match fs::read_to_string(&path) {
            Ok(text) => match serde_yaml::from_str::<RawRecipe>(&text) {
                Ok(raw) => recipes.push((origin, raw)),
                Err(err) => sink.error(&origin, format!("invalid schema: {err}")),
            },
            Err(err) => sink.error(&origin, format!("cannot read {}: {err}", path.display())),
        }
    }
    recipes
}
