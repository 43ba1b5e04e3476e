use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::ingredient::{Section, Unit};
use super::recipe::IngredientRole;

/// Quantities are held as `f64` but rendered without a fractional part when
/// integral, matching the artifact contract (`"proteinQty": 210`, not `210.0`).
#[allow(clippy::cast_possible_truncation)]
fn serialize_qty<S>(qty: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if qty.fract() == 0.0 && qty.abs() < 9.0e15 {
        serializer.serialize_i64(*qty as i64)
    } else {
        serializer.serialize_f64(*qty)
    }
}

fn serialize_opt_qty<S>(qty: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match qty {
        Some(value) => serialize_qty(value, serializer),
        None => serializer.serialize_none(),
    }
}

/// An absent carb choice serializes as the literal string `"none"`.
fn serialize_carb<S>(carb: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match carb {
        Some(id) => serializer.serialize_str(id),
        None => serializer.serialize_str("none"),
    }
}

fn serialize_unit_symbol<S>(unit: &Unit, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(unit.symbol())
}

/// One fully-resolved ingredient line of an assigned slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedIngredient {
    pub item: String,
    pub display: String,
    #[serde(serialize_with = "serialize_qty")]
    pub qty: f64,
    #[serde(serialize_with = "serialize_unit_symbol")]
    pub unit: Unit,
    pub role: IngredientRole,
}

/// One assigned (day, meal) slot of the weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRecord {
    pub day: String,
    pub meal: String,
    #[serde(rename = "recipeId")]
    pub recipe_id: String,
    #[serde(rename = "recipeName")]
    pub recipe_name: String,
    pub protein: String,
    #[serde(rename = "proteinQty", serialize_with = "serialize_qty")]
    pub protein_qty: f64,
    #[serde(serialize_with = "serialize_carb")]
    pub carb: Option<String>,
    #[serde(rename = "carbQty", serialize_with = "serialize_opt_qty")]
    pub carb_qty: Option<f64>,
    pub ingredients: Vec<ResolvedIngredient>,
}

/// Summary counters derived from the assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanDerived {
    pub protein_counts: BTreeMap<String, u32>,
    pub carb_counts: BTreeMap<String, u32>,
}

/// The `plan.json` artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPlan {
    pub seed: u64,
    pub slots: Vec<SlotRecord>,
    pub derived: PlanDerived,
}

/// One line of the shopping artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingLine {
    pub item: String,
    pub display: String,
    #[serde(serialize_with = "serialize_qty")]
    pub quantity: f64,
    #[serde(serialize_with = "serialize_unit_symbol")]
    pub unit: Unit,
}

/// The `shopping_list.json` artifact. Sections are keyed by their display
/// order (`Section`'s `Ord`); empty sections are never inserted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShoppingList {
    pub sections: BTreeMap<Section, Vec<ShoppingLine>>,
}
