use std::collections::{BTreeMap, BTreeSet};

use super::diagnostics::DiagnosticSink;
use crate::data_types::{
    CarbStrategy, Ingredient, IngredientKind, IngredientRole, Quantity, Recipe, Rules,
};

const RULES_ORIGIN: &str = "rules.yml";
const INGREDIENTS_ORIGIN: &str = "ingredients.yml";
const PANTRY_ORIGIN: &str = "pantry.yml";

fn is_snake_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Checks the ingredient catalog in isolation and returns the id-indexed map
/// used by every other validation pass. First occurrence wins on duplicates;
/// the duplicate itself is reported.
pub fn validate_ingredients(
    ingredients: &[Ingredient],
    sink: &mut DiagnosticSink,
) -> BTreeMap<String, Ingredient> {
    let mut by_id: BTreeMap<String, Ingredient> = BTreeMap::new();

    for ingredient in ingredients {
        if !is_snake_id(&ingredient.id) {
            sink.error(
                INGREDIENTS_ORIGIN,
                format!("`{}` is not a lowercase snake_case identifier", ingredient.id),
            );
        }
        if by_id.contains_key(&ingredient.id) {
            sink.error(
                INGREDIENTS_ORIGIN,
                format!("duplicate ingredient id `{}`", ingredient.id),
            );
            continue;
        }

        if ingredient.kind == IngredientKind::Carb {
            if let Some(qty) = ingredient.default_qty
                && qty < 0.0
            {
                sink.error(
                    INGREDIENTS_ORIGIN,
                    format!("`{}`: default_qty must be >= 0, got {qty}", ingredient.id),
                );
            }
            if let Some(max) = ingredient.max_times_week
                && max < 0.0
            {
                sink.error(
                    INGREDIENTS_ORIGIN,
                    format!("`{}`: max_times_week must be >= 0, got {max}", ingredient.id),
                );
            }
            if ingredient.has_fractional_cap()
                && let (Some(declared), Some(cap)) =
                    (ingredient.max_times_week, ingredient.weekly_cap())
            {
                sink.warning(
                    INGREDIENTS_ORIGIN,
                    format!(
                        "`{}`: fractional max_times_week {declared} is floored to {cap} occurrences per week{}",
                        ingredient.id,
                        if cap == 0 { " and forbids the carb entirely" } else { "" },
                    ),
                );
            }
        } else if ingredient.default_qty.is_some() || ingredient.max_times_week.is_some() {
            sink.error(
                INGREDIENTS_ORIGIN,
                format!(
                    "`{}`: default_qty and max_times_week are only valid for carb-kind ingredients",
                    ingredient.id
                ),
            );
        }

        by_id.insert(ingredient.id.clone(), ingredient.clone());
    }

    by_id
}

/// Checks the global rules: tag uniqueness, meal coverage, portion tables, and
/// the weekly protein total (which must equal the slot count).
pub fn validate_rules(
    rules: &Rules,
    ingredients: &BTreeMap<String, Ingredient>,
    sink: &mut DiagnosticSink,
) {
    if rules.days.is_empty() {
        sink.error(RULES_ORIGIN, "`days` must not be empty");
    }
    if rules.meals.is_empty() {
        sink.error(RULES_ORIGIN, "`meals` must not be empty");
    }
    let mut seen_days = BTreeSet::new();
    for day in &rules.days {
        if !seen_days.insert(day) {
            sink.error(RULES_ORIGIN, format!("duplicate day tag `{day}`"));
        }
    }
    let mut seen_meals = BTreeSet::new();
    for meal in &rules.meals {
        if !seen_meals.insert(meal.clone()) {
            sink.error(RULES_ORIGIN, format!("duplicate meal tag `{meal}`"));
        }
    }

    for meal in &rules.meals {
        if !rules.meal_rules.contains_key(meal) {
            sink.error(RULES_ORIGIN, format!("meal `{meal}` has no meal_rules entry"));
        }
    }
    for meal in rules.meal_rules.keys() {
        if !seen_meals.contains(meal) {
            sink.error(
                RULES_ORIGIN,
                format!("meal_rules entry for unknown meal `{meal}`"),
            );
        }
    }

    for (protein, per_meal) in &rules.protein_portions {
        for meal in per_meal.keys() {
            if !seen_meals.contains(meal) {
                sink.error(
                    RULES_ORIGIN,
                    format!("protein_portions for `{protein}` names unknown meal `{meal}`"),
                );
            }
        }
    }

    for meal in rules.carb_portions.default_per_meal.keys() {
        if !seen_meals.contains(meal) {
            sink.error(
                RULES_ORIGIN,
                format!("carb_portions.default_per_meal names unknown meal `{meal}`"),
            );
        }
    }
    for meal in &rules.meals {
        if rules.allow_carbs(meal) && !rules.carb_portions.default_per_meal.contains_key(meal) {
            sink.error(
                RULES_ORIGIN,
                format!("carb-allowing meal `{meal}` has no carb_portions.default_per_meal entry"),
            );
        }
    }
    for carb_id in rules.carb_portions.overrides.keys() {
        match ingredients.get(carb_id) {
            None => sink.error(
                RULES_ORIGIN,
                format!("carb_portions.overrides names unknown ingredient `{carb_id}`"),
            ),
            Some(ing) if ing.kind != IngredientKind::Carb => sink.error(
                RULES_ORIGIN,
                format!("carb_portions.overrides entry `{carb_id}` is not a carb-kind ingredient"),
            ),
            Some(_) => {}
        }
    }

    let total: u64 = rules
        .constraints
        .weekly_protein_counts
        .values()
        .map(|&c| u64::from(c))
        .sum();
    let slot_count = rules.slot_count() as u64;
    if total != slot_count {
        sink.error(
            RULES_ORIGIN,
            format!(
                "weekly_protein_counts sum to {total}, expected {slot_count} (|days| * |meals|)"
            ),
        );
    }
}

/// Pantry ids must reference catalog ingredients.
pub fn validate_pantry(
    items: &[String],
    ingredients: &BTreeMap<String, Ingredient>,
    sink: &mut DiagnosticSink,
) {
    for item in items {
        if !ingredients.contains_key(item) {
            sink.error(
                PANTRY_ORIGIN,
                format!("pantry names unknown ingredient `{item}`"),
            );
        }
    }
}

/// Per-recipe invariants: referential integrity, the single `@portion`
/// protein line, literal units, and carb-strategy coherence.
pub fn validate_recipes(
    recipes: &[(String, Recipe)],
    rules: &Rules,
    ingredients: &BTreeMap<String, Ingredient>,
    sink: &mut DiagnosticSink,
) {
    let mut seen_ids = BTreeSet::new();

    for (origin, recipe) in recipes {
        if !seen_ids.insert(recipe.id.clone()) {
            sink.error(origin, format!("duplicate recipe id `{}`", recipe.id));
        }

        validate_meal_types(origin, recipe, rules, sink);
        validate_ingredient_lines(origin, recipe, ingredients, sink);
        validate_carb_strategy(origin, recipe, ingredients, sink);
    }
}

fn validate_meal_types(origin: &str, recipe: &Recipe, rules: &Rules, sink: &mut DiagnosticSink) {
    if recipe.meal_types.is_empty() {
        sink.error(origin, "meal_types must not be empty");
    }
    let mut seen = BTreeSet::new();
    for meal in &recipe.meal_types {
        if !seen.insert(meal) {
            sink.error(origin, format!("duplicate meal type `{meal}`"));
        }
        if !rules.meals.contains(meal) {
            sink.error(origin, format!("meal type `{meal}` is not a known meal"));
        }
    }

    if rules.protein_portions.contains_key(&recipe.primary_protein) {
        for meal in &recipe.meal_types {
            if rules.meals.contains(meal)
                && rules.protein_portion(&recipe.primary_protein, meal).is_none()
            {
                sink.error(
                    origin,
                    format!(
                        "protein `{}` has no portion defined for meal `{meal}`",
                        recipe.primary_protein
                    ),
                );
            }
        }
    } else {
        sink.error(
            origin,
            format!("unknown protein kind `{}`", recipe.primary_protein),
        );
    }
}

fn validate_ingredient_lines(
    origin: &str,
    recipe: &Recipe,
    ingredients: &BTreeMap<String, Ingredient>,
    sink: &mut DiagnosticSink,
) {
    let mut protein_lines = 0u32;

    for line in &recipe.ingredients {
        let catalog_entry = ingredients.get(&line.item);
        if catalog_entry.is_none() {
            sink.error(origin, format!("unknown ingredient `{}`", line.item));
        }

        if line.role == IngredientRole::Protein {
            protein_lines += 1;
            if let Some(ing) = catalog_entry
                && ing.kind != IngredientKind::Protein
            {
                sink.error(
                    origin,
                    format!("protein-role line `{}` is not a protein-kind ingredient", line.item),
                );
            }
            if !line.quantity.is_portion() {
                sink.error(
                    origin,
                    format!("protein-role line `{}` must use the `@portion` quantity", line.item),
                );
            }
        } else if line.quantity.is_portion() {
            sink.error(
                origin,
                format!("`@portion` is only valid on the protein-role line, found on `{}`", line.item),
            );
        }

        if let (Quantity::Literal { unit, .. }, Some(ing)) = (line.quantity, catalog_entry)
            && unit != ing.unit
        {
            sink.error(
                origin,
                format!(
                    "`{}` is measured in {}, recipe declares {}",
                    line.item, ing.unit, unit
                ),
            );
        }
    }

    if protein_lines != 1 {
        sink.error(
            origin,
            format!("expected exactly one protein-role ingredient, found {protein_lines}"),
        );
    }
}

fn validate_carb_strategy(
    origin: &str,
    recipe: &Recipe,
    ingredients: &BTreeMap<String, Ingredient>,
    sink: &mut DiagnosticSink,
) {
    let carbs = &recipe.carbs;
    let carb_lines: Vec<&str> = recipe
        .ingredients
        .iter()
        .filter(|line| {
            ingredients
                .get(&line.item)
                .is_some_and(|ing| ing.kind == IngredientKind::Carb)
        })
        .map(|line| line.item.as_str())
        .collect();

    let check_carb_ref = |id: &str, field: &str, sink: &mut DiagnosticSink| match ingredients.get(id)
    {
        None => sink.error(origin, format!("carbs.{field} names unknown ingredient `{id}`")),
        Some(ing) if ing.kind != IngredientKind::Carb => sink.error(
            origin,
            format!("carbs.{field} entry `{id}` is not a carb-kind ingredient"),
        ),
        Some(_) => {}
    };

    match carbs.strategy {
        CarbStrategy::None => {
            if carbs.allowed.is_some() || carbs.default.is_some() {
                sink.error(
                    origin,
                    "carbs.allowed and carbs.default must be absent when strategy is `none`",
                );
            }
            for item in &carb_lines {
                sink.error(
                    origin,
                    format!("carb-kind ingredient `{item}` not allowed when strategy is `none`"),
                );
            }
        }
        CarbStrategy::Fixed => {
            if carbs.allowed.is_some() {
                sink.error(origin, "carbs.allowed must be absent when strategy is `fixed`");
            }
            match &carbs.default {
                None => sink.error(origin, "carbs.default is required when strategy is `fixed`"),
                Some(default) => {
                    check_carb_ref(default, "default", sink);
                    for item in &carb_lines {
                        if item != default {
                            sink.error(
                                origin,
                                format!(
                                    "inline carb `{item}` does not match the fixed default `{default}`"
                                ),
                            );
                        }
                    }
                }
            }
        }
        CarbStrategy::Optional => {
            let allowed = carbs.allowed.as_deref().unwrap_or_default();
            if allowed.is_empty() {
                sink.error(
                    origin,
                    "carbs.allowed must be a non-empty list when strategy is `optional`",
                );
            }
            let mut seen = BTreeSet::new();
            for id in allowed {
                if !seen.insert(id) {
                    sink.error(origin, format!("carbs.allowed lists `{id}` twice"));
                }
                check_carb_ref(id, "allowed", sink);
            }
            match &carbs.default {
                None => sink.error(origin, "carbs.default is required when strategy is `optional`"),
                Some(default) => {
                    if !allowed.iter().any(|id| id == default) {
                        sink.error(
                            origin,
                            format!("carbs.default `{default}` is not in carbs.allowed"),
                        );
                    }
                }
            }
            for item in &carb_lines {
                if !allowed.iter().any(|id| id == item) {
                    sink.error(
                        origin,
                        format!("inline carb `{item}` is not in carbs.allowed"),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{CarbPortions, CarbSpec, ConstraintSettings, MealRule, Section, Unit};

    fn ingredient(id: &str, kind: IngredientKind, unit: Unit) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: id.to_string(),
            unit,
            section: Section::Other,
            kind,
            default_qty: None,
            max_times_week: None,
        }
    }

    fn base_ingredients() -> Vec<Ingredient> {
        vec![
            ingredient("chicken", IngredientKind::Protein, Unit::Grams),
            ingredient("rice", IngredientKind::Carb, Unit::Grams),
            ingredient("tomato", IngredientKind::Other, Unit::Grams),
        ]
    }

    fn base_rules() -> Rules {
        let mut meal_rules = BTreeMap::new();
        meal_rules.insert("lunch".to_string(), MealRule { allow_carbs: true });
        let mut chicken = BTreeMap::new();
        chicken.insert("lunch".to_string(), 210.0);
        let mut protein_portions = BTreeMap::new();
        protein_portions.insert("chicken".to_string(), chicken);
        let mut default_per_meal = BTreeMap::new();
        default_per_meal.insert("lunch".to_string(), 90.0);
        let mut weekly_protein_counts = BTreeMap::new();
        weekly_protein_counts.insert("chicken".to_string(), 2);
        Rules {
            days: vec!["mon".to_string(), "tue".to_string()],
            meals: vec!["lunch".to_string()],
            meal_rules,
            protein_portions,
            carb_portions: CarbPortions {
                default_per_meal,
                overrides: BTreeMap::new(),
            },
            constraints: ConstraintSettings {
                weekly_protein_counts,
                no_consecutive_same_protein: false,
                fish_dinner_max_per_week: 1,
                fish_dinner_max_consecutive: 1,
                max_recipe_uses_per_week: 2,
            },
        }
    }

    fn base_recipe() -> Recipe {
        Recipe {
            id: "pollo_toscano".to_string(),
            name: "Pollo toscano".to_string(),
            meal_types: vec!["lunch".to_string()],
            primary_protein: "chicken".to_string(),
            carbs: CarbSpec {
                strategy: CarbStrategy::None,
                allowed: None,
                default: None,
            },
            ingredients: vec![crate::data_types::RecipeIngredient {
                item: "chicken".to_string(),
                role: IngredientRole::Protein,
                quantity: Quantity::Portion,
            }],
        }
    }

    fn run_all(rules: &Rules, ingredients: Vec<Ingredient>, recipes: Vec<Recipe>) -> DiagnosticSink {
        let mut sink = DiagnosticSink::new();
        let map = validate_ingredients(&ingredients, &mut sink);
        validate_rules(rules, &map, &mut sink);
        let tagged: Vec<(String, Recipe)> = recipes
            .into_iter()
            .map(|r| (format!("recipes/{}.yml", r.id), r))
            .collect();
        validate_recipes(&tagged, rules, &map, &mut sink);
        sink
    }

    #[test]
    fn test_valid_catalog_passes() {
        let sink = run_all(&base_rules(), base_ingredients(), vec![base_recipe()]);
        assert!(!sink.has_errors(), "{:?}", sink.into_report());
    }

    #[test]
    fn test_duplicate_ingredient_id() {
        let mut ingredients = base_ingredients();
        ingredients.push(ingredient("rice", IngredientKind::Carb, Unit::Grams));
        let sink = run_all(&base_rules(), ingredients, vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_non_snake_ingredient_id() {
        let mut ingredients = base_ingredients();
        ingredients.push(ingredient("Brown-Rice", IngredientKind::Carb, Unit::Grams));
        let sink = run_all(&base_rules(), ingredients, vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_cap_fields_rejected_on_non_carb() {
        let mut ingredients = base_ingredients();
        ingredients[0].max_times_week = Some(2.0);
        let sink = run_all(&base_rules(), ingredients, vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_fractional_cap_warns_without_failing() {
        let mut ingredients = base_ingredients();
        ingredients[1].max_times_week = Some(0.5);
        let sink = run_all(&base_rules(), ingredients, vec![base_recipe()]);
        assert!(!sink.has_errors());
        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("forbids the carb entirely"));
    }

    #[test]
    fn test_weekly_counts_must_cover_every_slot() {
        let mut rules = base_rules();
        rules
            .constraints
            .weekly_protein_counts
            .insert("chicken".to_string(), 3);
        let sink = run_all(&rules, base_ingredients(), vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_meal_without_meal_rules_entry() {
        let mut rules = base_rules();
        rules.meals.push("dinner".to_string());
        rules
            .constraints
            .weekly_protein_counts
            .insert("chicken".to_string(), 4);
        let sink = run_all(&rules, base_ingredients(), vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_carb_allowing_meal_needs_default_portion() {
        let mut rules = base_rules();
        rules.carb_portions.default_per_meal.clear();
        let sink = run_all(&rules, base_ingredients(), vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_override_must_be_carb_kind() {
        let mut rules = base_rules();
        rules
            .carb_portions
            .overrides
            .insert("tomato".to_string(), 100.0);
        let sink = run_all(&rules, base_ingredients(), vec![base_recipe()]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_unknown_pantry_item() {
        let mut sink = DiagnosticSink::new();
        let map = validate_ingredients(&base_ingredients(), &mut sink);
        validate_pantry(&["saffron".to_string()], &map, &mut sink);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_duplicate_recipe_id() {
        let sink = run_all(
            &base_rules(),
            base_ingredients(),
            vec![base_recipe(), base_recipe()],
        );
        assert!(sink.has_errors());
    }

    #[test]
    fn test_unknown_meal_type() {
        let mut recipe = base_recipe();
        recipe.meal_types = vec!["brunch".to_string()];
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_unknown_primary_protein() {
        let mut recipe = base_recipe();
        recipe.primary_protein = "tofu".to_string();
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_missing_portion_for_meal() {
        let mut rules = base_rules();
        rules.meals.push("dinner".to_string());
        rules
            .meal_rules
            .insert("dinner".to_string(), MealRule { allow_carbs: false });
        rules
            .constraints
            .weekly_protein_counts
            .insert("chicken".to_string(), 4);
        let mut recipe = base_recipe();
        recipe.meal_types.push("dinner".to_string());
        let sink = run_all(&rules, base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_unknown_recipe_item() {
        let mut recipe = base_recipe();
        recipe.ingredients.push(crate::data_types::RecipeIngredient {
            item: "saffron".to_string(),
            role: IngredientRole::Spice,
            quantity: Quantity::Literal {
                value: 1.0,
                unit: Unit::Grams,
            },
        });
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_two_protein_lines_rejected() {
        let mut recipe = base_recipe();
        recipe.ingredients.push(crate::data_types::RecipeIngredient {
            item: "chicken".to_string(),
            role: IngredientRole::Protein,
            quantity: Quantity::Portion,
        });
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_portion_outside_protein_role_rejected() {
        let mut recipe = base_recipe();
        recipe.ingredients.push(crate::data_types::RecipeIngredient {
            item: "tomato".to_string(),
            role: IngredientRole::Veg,
            quantity: Quantity::Portion,
        });
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_literal_unit_mismatch_rejected() {
        let mut recipe = base_recipe();
        recipe.ingredients.push(crate::data_types::RecipeIngredient {
            item: "tomato".to_string(),
            role: IngredientRole::Veg,
            quantity: Quantity::Literal {
                value: 100.0,
                unit: Unit::Milliliters,
            },
        });
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_none_strategy_rejects_carb_lines() {
        let mut recipe = base_recipe();
        recipe.ingredients.push(crate::data_types::RecipeIngredient {
            item: "rice".to_string(),
            role: IngredientRole::Carb,
            quantity: Quantity::Literal {
                value: 90.0,
                unit: Unit::Grams,
            },
        });
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_fixed_strategy_requires_default() {
        let mut recipe = base_recipe();
        recipe.carbs.strategy = CarbStrategy::Fixed;
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_fixed_default_must_be_carb() {
        let mut recipe = base_recipe();
        recipe.carbs.strategy = CarbStrategy::Fixed;
        recipe.carbs.default = Some("tomato".to_string());
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_optional_default_must_be_in_allowed() {
        let mut recipe = base_recipe();
        recipe.carbs.strategy = CarbStrategy::Optional;
        recipe.carbs.allowed = Some(vec!["rice".to_string()]);
        recipe.carbs.default = Some("potato".to_string());
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(sink.has_errors());
    }

    #[test]
    fn test_optional_strategy_accepts_valid_spec() {
        let mut recipe = base_recipe();
        recipe.carbs.strategy = CarbStrategy::Optional;
        recipe.carbs.allowed = Some(vec!["rice".to_string()]);
        recipe.carbs.default = Some("rice".to_string());
        let sink = run_all(&base_rules(), base_ingredients(), vec![recipe]);
        assert!(!sink.has_errors(), "{:?}", sink.into_report());
    }
}
