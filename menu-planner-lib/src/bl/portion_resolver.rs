use tracing::debug;

use super::schedule_solver::Assignment;
use super::slot_model::SlotModel;
use crate::data_types::{IngredientKind, IngredientRole, Quantity, ResolvedIngredient, SlotRecord};
use crate::error::PlannerError;

/// Lowers the solver's assignment into fully-resolved slot records: the
/// `@portion` protein line gets its rules-defined quantity, carb-kind lines
/// from the recipe are dropped, and the variant's carb choice (if any) is
/// synthesized from the global portion tables. Pure function of
/// (catalog, assignment).
pub fn resolve_assignment(
    model: &SlotModel,
    assignment: &Assignment,
) -> Result<Vec<SlotRecord>, PlannerError> {
    if assignment.chosen.len() != model.slots.len() {
        return Err(PlannerError::Internal(format!(
            "assignment covers {} slots, model has {}",
            assignment.chosen.len(),
            model.slots.len()
        )));
    }

    let catalog = model.catalog;
    let rules = &catalog.rules;
    let mut records = Vec::with_capacity(model.slots.len());

    for (slot, &variant_idx) in model.slots.iter().zip(&assignment.chosen) {
        let variant = &model.variants[variant_idx];
        let recipe = catalog.recipes.get(variant.recipe_idx).ok_or_else(|| {
            PlannerError::Internal(format!("variant references missing recipe {}", variant.recipe_idx))
        })?;
        let protein_qty = rules
            .protein_portion(&variant.protein, &slot.meal)
            .ok_or_else(|| {
                PlannerError::Internal(format!(
                    "no portion for protein `{}` at meal `{}`",
                    variant.protein, slot.meal
                ))
            })?;

        let mut ingredients = Vec::with_capacity(recipe.ingredients.len() + 1);
        for line in &recipe.ingredients {
            let ing = catalog.ingredient(&line.item).ok_or_else(|| {
                PlannerError::Internal(format!("unknown ingredient `{}` survived validation", line.item))
            })?;
            // Carb-kind lines are re-synthesized from the variant's choice;
            // an inline literal never overrides the global portion tables.
            if ing.kind == IngredientKind::Carb {
                continue;
            }
            let qty = match line.quantity {
                Quantity::Portion => protein_qty,
                Quantity::Literal { value, .. } => value,
            };
            ingredients.push(ResolvedIngredient {
                item: line.item.clone(),
                display: ing.name.clone(),
                qty,
                unit: ing.unit,
                role: line.role,
            });
        }

        let mut carb_qty = None;
        if let Some(carb_id) = &variant.carb {
            let ing = catalog.ingredient(carb_id).ok_or_else(|| {
                PlannerError::Internal(format!("unknown carb `{carb_id}` survived validation"))
            })?;
            let qty = rules.carb_portion(carb_id, &slot.meal).ok_or_else(|| {
                PlannerError::Internal(format!(
                    "no carb portion for `{carb_id}` at meal `{}`",
                    slot.meal
                ))
            })?;
            ingredients.push(ResolvedIngredient {
                item: carb_id.clone(),
                display: ing.name.clone(),
                qty,
                unit: ing.unit,
                role: IngredientRole::Carb,
            });
            carb_qty = Some(qty);
        }

        records.push(SlotRecord {
            day: slot.day.clone(),
            meal: slot.meal.clone(),
            recipe_id: recipe.id.clone(),
            recipe_name: recipe.name.clone(),
            protein: variant.protein.clone(),
            protein_qty,
            carb: variant.carb.clone(),
            carb_qty,
            ingredients,
        });
    }

    debug!(slots = records.len(), "assignment resolved");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bl::slot_model::SlotModel;
    use crate::bl::variant_expander::SlotVariant;
    use crate::data_types::{
        CarbPortions, CarbSpec, CarbStrategy, Catalog, ConstraintSettings, Ingredient, MealRule,
        Recipe, RecipeIngredient, Rules, Section, Unit,
    };
    use approx::assert_relative_eq;
    use std::collections::{BTreeMap, BTreeSet};

    fn ingredient(id: &str, name: &str, unit: Unit, section: Section, kind: IngredientKind) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: name.to_string(),
            unit,
            section,
            kind,
            default_qty: None,
            max_times_week: None,
        }
    }

    fn catalog() -> Catalog {
        let mut ingredients = BTreeMap::new();
        for ing in [
            ingredient("chicken", "Pollo", Unit::Grams, Section::Protein, IngredientKind::Protein),
            ingredient("rice", "Arroz", Unit::Grams, Section::Carb, IngredientKind::Carb),
            ingredient("pasta", "Pasta", Unit::Grams, Section::Carb, IngredientKind::Carb),
            ingredient("potato", "Patata", Unit::Grams, Section::Carb, IngredientKind::Carb),
            ingredient("tomato", "Tomate", Unit::Grams, Section::Vegetable, IngredientKind::Other),
        ] {
            ingredients.insert(ing.id.clone(), ing);
        }

        let mut meal_rules = BTreeMap::new();
        meal_rules.insert("lunch".to_string(), MealRule { allow_carbs: true });
        meal_rules.insert("dinner".to_string(), MealRule { allow_carbs: false });

        let mut chicken_portions = BTreeMap::new();
        chicken_portions.insert("lunch".to_string(), 210.0);
        chicken_portions.insert("dinner".to_string(), 180.0);
        let mut protein_portions = BTreeMap::new();
        protein_portions.insert("chicken".to_string(), chicken_portions);

        let mut default_per_meal = BTreeMap::new();
        default_per_meal.insert("lunch".to_string(), 90.0);
        let mut overrides = BTreeMap::new();
        overrides.insert("potato".to_string(), 250.0);

        let recipe = Recipe {
            id: "pollo_toscano".to_string(),
            name: "Pollo toscano".to_string(),
            meal_types: vec!["lunch".to_string(), "dinner".to_string()],
            primary_protein: "chicken".to_string(),
            carbs: CarbSpec {
                strategy: CarbStrategy::Optional,
                allowed: Some(vec![
                    "rice".to_string(),
                    "pasta".to_string(),
                    "potato".to_string(),
                ]),
                default: Some("rice".to_string()),
            },
            ingredients: vec![
                RecipeIngredient {
                    item: "chicken".to_string(),
                    role: IngredientRole::Protein,
                    quantity: Quantity::Portion,
                },
                // Inline default carb; its literal quantity must be ignored.
                RecipeIngredient {
                    item: "rice".to_string(),
                    role: IngredientRole::Carb,
                    quantity: Quantity::Literal {
                        value: 999.0,
                        unit: Unit::Grams,
                    },
                },
                RecipeIngredient {
                    item: "tomato".to_string(),
                    role: IngredientRole::Veg,
                    quantity: Quantity::Literal {
                        value: 150.0,
                        unit: Unit::Grams,
                    },
                },
            ],
        };

        Catalog {
            rules: Rules {
                days: vec!["mon".to_string()],
                meals: vec!["lunch".to_string(), "dinner".to_string()],
                meal_rules,
                protein_portions,
                carb_portions: CarbPortions {
                    default_per_meal,
                    overrides,
                },
                constraints: ConstraintSettings {
                    weekly_protein_counts: BTreeMap::from([("chicken".to_string(), 2)]),
                    no_consecutive_same_protein: false,
                    fish_dinner_max_per_week: 2,
                    fish_dinner_max_consecutive: 1,
                    max_recipe_uses_per_week: 2,
                },
            },
            ingredients,
            pantry: BTreeSet::new(),
            recipes: vec![recipe],
        }
    }

    fn variant(meal: &str, carb: Option<&str>) -> SlotVariant {
        SlotVariant {
            recipe_idx: 0,
            recipe_id: "pollo_toscano".to_string(),
            meal: meal.to_string(),
            protein: "chicken".to_string(),
            carb: carb.map(String::from),
        }
    }

    fn resolve(variants: Vec<SlotVariant>, chosen: Vec<usize>) -> Vec<SlotRecord> {
        let catalog = catalog();
        let model = SlotModel::build(&catalog, variants, 0).expect("model");
        resolve_assignment(&model, &Assignment { chosen }).expect("resolution")
    }

    #[test]
    fn test_portion_substitution_follows_meal() {
        let records = resolve(
            vec![variant("lunch", None), variant("dinner", None)],
            vec![0, 1],
        );
        assert_relative_eq!(records[0].protein_qty, 210.0);
        assert_relative_eq!(records[1].protein_qty, 180.0);
        let chicken = &records[0].ingredients[0];
        assert_eq!(chicken.item, "chicken");
        assert_relative_eq!(chicken.qty, 210.0);
    }

    #[test]
    fn test_inline_carb_literal_is_replaced_by_portion_rules() {
        let records = resolve(
            vec![variant("lunch", Some("rice")), variant("dinner", None)],
            vec![0, 1],
        );
        let rice: Vec<_> = records[0]
            .ingredients
            .iter()
            .filter(|line| line.item == "rice")
            .collect();
        assert_eq!(rice.len(), 1);
        assert_relative_eq!(rice[0].qty, 90.0);
        assert_eq!(records[0].carb_qty, Some(90.0));
    }

    #[test]
    fn test_chosen_carb_differs_from_inline_default() {
        let records = resolve(
            vec![variant("lunch", Some("pasta")), variant("dinner", None)],
            vec![0, 1],
        );
        let items: Vec<&str> = records[0]
            .ingredients
            .iter()
            .map(|line| line.item.as_str())
            .collect();
        assert!(items.contains(&"pasta"));
        assert!(!items.contains(&"rice"), "inline default must be dropped");
        assert_eq!(records[0].carb.as_deref(), Some("pasta"));
    }

    #[test]
    fn test_carb_override_beats_meal_default() {
        let records = resolve(
            vec![variant("lunch", Some("potato")), variant("dinner", None)],
            vec![0, 1],
        );
        assert_eq!(records[0].carb_qty, Some(250.0));
    }

    #[test]
    fn test_empty_carb_removes_every_carb_line() {
        let records = resolve(
            vec![variant("lunch", None), variant("dinner", None)],
            vec![0, 1],
        );
        for record in &records {
            assert_eq!(record.carb, None);
            assert_eq!(record.carb_qty, None);
            assert!(record.ingredients.iter().all(|line| line.item != "rice"));
        }
    }

    #[test]
    fn test_slot_records_follow_grid_order() {
        let records = resolve(
            vec![variant("lunch", None), variant("dinner", None)],
            vec![0, 1],
        );
        assert_eq!(records[0].meal, "lunch");
        assert_eq!(records[1].meal, "dinner");
        assert_eq!(records[0].day, "mon");
        assert_eq!(records[0].recipe_name, "Pollo toscano");
    }

    #[test]
    fn test_length_mismatch_is_internal_error() {
        let catalog = catalog();
        let model = SlotModel::build(
            &catalog,
            vec![variant("lunch", None), variant("dinner", None)],
            0,
        )
        .expect("model");
        let err = resolve_assignment(&model, &Assignment { chosen: vec![0] })
            .expect_err("length mismatch");
        assert!(matches!(err, PlannerError::Internal(_)));
    }
}
