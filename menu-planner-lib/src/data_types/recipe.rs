use core::fmt;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount, EnumIter};

use super::ingredient::Unit;

/// How a recipe relates to carbohydrates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, EnumCount, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbStrategy {
    None,
    Fixed,
    Optional,
}

impl fmt::Display for CarbStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CarbStrategy::None => "none",
            CarbStrategy::Fixed => "fixed",
            CarbStrategy::Optional => "optional",
        };
        write!(f, "{name}")
    }
}

/// Role an ingredient line plays inside one recipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, EnumCount, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientRole {
    Protein,
    Carb,
    Veg,
    Fat,
    Dairy,
    Condiment,
    Spice,
    Other,
}

/// Quantity of one recipe ingredient line.
///
/// The `@portion` YAML token is resolved to `Quantity::Portion` at the parsing
/// boundary; it is only legal on the protein-role line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Portion,
    Literal { value: f64, unit: Unit },
}

impl Quantity {
    #[must_use]
    pub fn is_portion(self) -> bool {
        matches!(self, Quantity::Portion)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeIngredient {
    pub item: String,
    pub role: IngredientRole,
    pub quantity: Quantity,
}

/// Carb selection block of a recipe. Field coherence (`allowed` iff optional,
/// `default` iff fixed or optional) is enforced by the catalog loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarbSpec {
    pub strategy: CarbStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A validated recipe from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub meal_types: Vec<String>,
    pub primary_protein: String,
    pub carbs: CarbSpec,
    pub ingredients: Vec<RecipeIngredient>,
}

impl Recipe {
    /// The single protein-role line; validated recipes always have exactly one.
    #[must_use]
    pub fn protein_line(&self) -> Option<&RecipeIngredient> {
        self.ingredients
            .iter()
            .find(|line| line.role == IngredientRole::Protein)
    }
}
