use std::collections::{BTreeMap, BTreeSet};

use super::ingredient::Ingredient;
use super::recipe::Recipe;
use super::rules::Rules;

/// The fully validated input model. Built once by the catalog loader and
/// passed by immutable reference through the rest of the pipeline; every
/// lookup a later stage performs is guaranteed to succeed by the loader's
/// invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub rules: Rules,
    pub ingredients: BTreeMap<String, Ingredient>,
    pub pantry: BTreeSet<String>,
    /// Recipes sorted by id, so downstream iteration order is deterministic.
    pub recipes: Vec<Recipe>,
}

impl Catalog {
    #[must_use]
    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients.get(id)
    }

    #[must_use]
    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// Carb ingredients that carry a weekly usage cap, in id order.
    pub fn capped_carbs(&self) -> impl Iterator<Item = (&Ingredient, u32)> {
        self.ingredients
            .values()
            .filter_map(|ing| ing.weekly_cap().map(|cap| (ing, cap)))
    }
}
