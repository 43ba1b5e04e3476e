use serde::Deserialize;

use super::diagnostics::DiagnosticSink;
use crate::data_types::{CarbSpec, Ingredient, IngredientRole, Quantity, Recipe, RecipeIngredient, Unit};

/// Sentinel marking the portion-resolved quantity in recipe YAML. The token
/// never survives parsing; it becomes `Quantity::Portion`.
pub const PORTION_TOKEN: &str = "@portion";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngredientsFile {
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PantryFile {
    pub items: Vec<String>,
}

/// A quantity as it appears in YAML: a number, or the `@portion` token.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawQty {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawIngredientLine {
    pub item: String,
    pub role: IngredientRole,
    pub qty: RawQty,
    #[serde(default)]
    pub unit: Option<Unit>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRecipe {
    pub id: String,
    pub name: String,
    pub meal_types: Vec<String>,
    pub primary_protein: String,
    pub carbs: CarbSpec,
    pub ingredients: Vec<RawIngredientLine>,
}

/// Lowers a parsed recipe into the typed model, turning the `@portion` token
/// into `Quantity::Portion`. Returns `None` when any line is malformed; the
/// findings are recorded in the sink either way.
pub fn convert_recipe(raw: RawRecipe, origin: &str, sink: &mut DiagnosticSink) -> Option<Recipe> {
    let mut ingredients = Vec::with_capacity(raw.ingredients.len());
    let mut line_errors = false;

    for line in raw.ingredients {
        let quantity = match line.qty {
            RawQty::Text(token) if token == PORTION_TOKEN => {
                if line.unit.is_some() {
                    sink.error(
                        origin,
                        format!("ingredient `{}`: `{PORTION_TOKEN}` does not take a unit", line.item),
                    );
                    line_errors = true;
                    continue;
                }
                Quantity::Portion
            }
            RawQty::Text(token) => {
                sink.error(
                    origin,
                    format!("ingredient `{}`: unknown quantity token `{token}`", line.item),
                );
                line_errors = true;
                continue;
            }
            RawQty::Number(value) => {
                if value < 0.0 {
                    sink.error(
                        origin,
                        format!("ingredient `{}`: negative quantity {value}", line.item),
                    );
                    line_errors = true;
                    continue;
                }
                let Some(unit) = line.unit else {
                    sink.error(
                        origin,
                        format!("ingredient `{}`: literal quantity requires a unit", line.item),
                    );
                    line_errors = true;
                    continue;
                };
                Quantity::Literal { value, unit }
            }
        };
        ingredients.push(RecipeIngredient {
            item: line.item,
            role: line.role,
            quantity,
        });
    }

    if line_errors {
        return None;
    }
    Some(Recipe {
        id: raw.id,
        name: raw.name,
        meal_types: raw.meal_types,
        primary_protein: raw.primary_protein,
        carbs: raw.carbs,
        ingredients,
    })
}
