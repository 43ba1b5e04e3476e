use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::variant_expander::SlotVariant;
use crate::data_types::Catalog;
use crate::error::PlannerError;
use crate::loader::DiagnosticSink;

/// One assignable (day, meal) position of the week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub day: String,
    pub meal: String,
    pub day_idx: usize,
    pub meal_idx: usize,
}

/// The decision space of one scheduling run: every slot of the week paired
/// with the variants admissible there. The per-slot variant order is shuffled
/// by the run seed, which is the sole source of plan-to-plan variety; the
/// solver itself is deterministic.
#[derive(Debug)]
pub struct SlotModel<'a> {
    pub catalog: &'a Catalog,
    pub variants: Vec<SlotVariant>,
    pub slots: Vec<Slot>,
    /// Per slot: indices into `variants`, seed-shuffled.
    pub admissible: Vec<Vec<usize>>,
}

impl<'a> SlotModel<'a> {
    /// Builds the slot grid in day-major order and partitions the variants by
    /// meal. A slot no variant can fill is a catalog-level defect and is
    /// reported through the usual validation channel.
    pub fn build(
        catalog: &'a Catalog,
        variants: Vec<SlotVariant>,
        seed: u64,
    ) -> Result<Self, PlannerError> {
        let rules = &catalog.rules;
        let mut slots = Vec::with_capacity(rules.slot_count());
        for (day_idx, day) in rules.days.iter().enumerate() {
            for (meal_idx, meal) in rules.meals.iter().enumerate() {
                slots.push(Slot {
                    day: day.clone(),
                    meal: meal.clone(),
                    day_idx,
                    meal_idx,
                });
            }
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut admissible = Vec::with_capacity(slots.len());
        let mut sink = DiagnosticSink::new();
        for slot in &slots {
            let mut indices: Vec<usize> = variants
                .iter()
                .enumerate()
                .filter(|(_, v)| v.meal == slot.meal)
                .map(|(idx, _)| idx)
                .collect();
            if indices.is_empty() {
                sink.error(
                    "model",
                    format!(
                        "no admissible recipe variant for slot ({}, {})",
                        slot.day, slot.meal
                    ),
                );
            }
            indices.shuffle(&mut rng);
            admissible.push(indices);
        }
        if sink.has_errors() {
            return Err(PlannerError::Validation(sink.into_report()));
        }

        debug!(
            slots = slots.len(),
            variants = variants.len(),
            seed,
            "slot model built"
        );
        Ok(Self {
            catalog,
            variants,
            slots,
            admissible,
        })
    }

    /// Index of the slot at (day, meal) position in the day-major grid.
    #[must_use]
    pub fn slot_index(&self, day_idx: usize, meal_idx: usize) -> usize {
        day_idx * self.catalog.rules.meals.len() + meal_idx
    }
}
