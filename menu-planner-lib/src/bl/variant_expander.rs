use tracing::debug;

use crate::data_types::{CarbStrategy, Catalog, Recipe, Rules};

/// An atomic scheduling choice: a base recipe at a specific meal with a
/// specific carb selection (`None` = no carb side).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotVariant {
    /// Index of the base recipe in `catalog.recipes`.
    pub recipe_idx: usize,
    pub recipe_id: String,
    pub meal: String,
    pub protein: String,
    pub carb: Option<String>,
}

/// Expands every recipe of the catalog into its slot variants, in catalog
/// order. Pure function of the frozen catalog.
#[must_use]
pub fn expand_catalog(catalog: &Catalog) -> Vec<SlotVariant> {
    let variants: Vec<SlotVariant> = catalog
        .recipes
        .iter()
        .enumerate()
        .flat_map(|(idx, recipe)| expand_recipe(idx, recipe, &catalog.rules))
        .collect();
    debug!(
        recipes = catalog.recipes.len(),
        variants = variants.len(),
        "expanded recipe variants"
    );
    variants
}

fn expand_recipe(recipe_idx: usize, recipe: &Recipe, rules: &Rules) -> Vec<SlotVariant> {
    let mut variants = Vec::new();
    for meal in &recipe.meal_types {
        let make = |carb: Option<String>| SlotVariant {
            recipe_idx,
            recipe_id: recipe.id.clone(),
            meal: meal.clone(),
            protein: recipe.primary_protein.clone(),
            carb,
        };

        if !rules.allow_carbs(meal) {
            // Carb-free meal: every strategy collapses to the bare variant.
            variants.push(make(None));
            continue;
        }
        match recipe.carbs.strategy {
            CarbStrategy::None => variants.push(make(None)),
            CarbStrategy::Fixed => variants.push(make(recipe.carbs.default.clone())),
            CarbStrategy::Optional => {
                for carb in recipe.carbs.allowed.as_deref().unwrap_or_default() {
                    variants.push(make(Some(carb.clone())));
                }
                // "Optional" includes declining the carb altogether.
                variants.push(make(None));
            }
        }
    }
    variants
}
