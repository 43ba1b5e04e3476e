use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protein tag whose dinner occurrences are capped by the fish constraints.
pub const FISH_PROTEIN: &str = "fish";
/// Meal tag the fish caps apply to.
pub const DINNER_MEAL: &str = "dinner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MealRule {
    pub allow_carbs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarbPortions {
    pub default_per_meal: BTreeMap<String, f64>,
    #[serde(default)]
    pub overrides: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSettings {
    pub weekly_protein_counts: BTreeMap<String, u32>,
    pub no_consecutive_same_protein: bool,
    pub fish_dinner_max_per_week: u32,
    pub fish_dinner_max_consecutive: u32,
    pub max_recipe_uses_per_week: u32,
}

/// Global planning rules, read once per run and frozen thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rules {
    pub days: Vec<String>,
    pub meals: Vec<String>,
    pub meal_rules: BTreeMap<String, MealRule>,
    pub protein_portions: BTreeMap<String, BTreeMap<String, f64>>,
    pub carb_portions: CarbPortions,
    pub constraints: ConstraintSettings,
}

impl Rules {
    /// Number of assignable slots in the week.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.days.len() * self.meals.len()
    }

    /// Whether the given meal admits a carb side. Unknown meals never do.
    #[must_use]
    pub fn allow_carbs(&self, meal: &str) -> bool {
        self.meal_rules.get(meal).is_some_and(|r| r.allow_carbs)
    }

    /// Portion for a protein kind at a meal, if the rules define one.
    #[must_use]
    pub fn protein_portion(&self, protein: &str, meal: &str) -> Option<f64> {
        self.protein_portions
            .get(protein)
            .and_then(|per_meal| per_meal.get(meal))
            .copied()
    }

    /// Carb portion for an ingredient at a meal: the per-ingredient override
    /// wins over the meal default.
    #[must_use]
    pub fn carb_portion(&self, carb_id: &str, meal: &str) -> Option<f64> {
        self.carb_portions
            .overrides
            .get(carb_id)
            .or_else(|| self.carb_portions.default_per_meal.get(meal))
            .copied()
    }

    /// Target weekly count for a protein; proteins missing from the table
    /// default to zero.
    #[must_use]
    pub fn weekly_protein_count(&self, protein: &str) -> u32 {
        self.constraints
            .weekly_protein_counts
            .get(protein)
            .copied()
            .unwrap_or(0)
    }
}
