use std::collections::BTreeMap;

use tracing::debug;

use crate::data_types::{Catalog, PlanDerived, ShoppingLine, ShoppingList, SlotRecord, Unit};

/// Sums every resolved ingredient line across the week, drops pantry staples,
/// and groups what remains by shopping section. Lines within a section are
/// ordered by display name (plain codepoint order).
#[must_use]
pub fn aggregate_shopping(catalog: &Catalog, slots: &[SlotRecord]) -> ShoppingList {
    let mut totals: BTreeMap<(String, Unit), f64> = BTreeMap::new();
    for slot in slots {
        for line in &slot.ingredients {
            if catalog.pantry.contains(&line.item) {
                continue;
            }
            *totals.entry((line.item.clone(), line.unit)).or_insert(0.0) += line.qty;
        }
    }

    let mut list = ShoppingList::default();
    for ((item, unit), quantity) in totals {
        let Some(ingredient) = catalog.ingredient(&item) else {
            // Resolved lines always come from the catalog.
            continue;
        };
        list.sections
            .entry(ingredient.section)
            .or_default()
            .push(ShoppingLine {
                item,
                display: ingredient.name.clone(),
                quantity,
                unit,
            });
    }
    for lines in list.sections.values_mut() {
        lines.sort_by(|a, b| a.display.cmp(&b.display));
    }

    debug!(
        sections = list.sections.len(),
        lines = list.sections.values().map(Vec::len).sum::<usize>(),
        "shopping list aggregated"
    );
    list
}

/// Per-protein and per-carb counters for the plan's `derived` block. Slots
/// without a carb are not counted on the carb side.
#[must_use]
pub fn derive_counts(slots: &[SlotRecord]) -> PlanDerived {
    let mut derived = PlanDerived::default();
    for slot in slots {
        *derived.protein_counts.entry(slot.protein.clone()).or_insert(0) += 1;
        if let Some(carb) = &slot.carb {
            *derived.carb_counts.entry(carb.clone()).or_insert(0) += 1;
        }
    }
    derived
}
