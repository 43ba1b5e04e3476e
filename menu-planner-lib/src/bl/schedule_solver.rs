use std::collections::BTreeSet;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};
use tracing::{debug, info};

use super::slot_model::SlotModel;
use super::variant_expander::SlotVariant;
use crate::data_types::{DINNER_MEAL, FISH_PROTEIN};
use crate::error::PlannerError;

/// For each slot (day-major order), the index of the selected variant in the
/// model's variant table. Immutable once returned by the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub chosen: Vec<usize>,
}

/// Encodes the weekly scheduling problem as a 0/1 integer program: one binary
/// selector per (slot, admissible variant), an exactly-one constraint per
/// slot, and the hard constraint families as linear sums over the selectors.
/// Pure satisfaction: every objective coefficient is zero.
pub struct ScheduleSolver {
    problem: Problem,
    /// Per slot: (variant index, selector variable), in seed-shuffled order.
    slot_vars: Vec<Vec<(usize, Variable)>>,
    families: Vec<&'static str>,
    trivially_infeasible: Option<String>,
}

impl ScheduleSolver {
    #[must_use]
    pub fn new(model: &SlotModel) -> Self {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let mut slot_vars = Vec::with_capacity(model.admissible.len());
        for admissible in &model.admissible {
            let vars: Vec<(usize, Variable)> = admissible
                .iter()
                .map(|&variant_idx| (variant_idx, problem.add_integer_var(0.0, (0, 1))))
                .collect();
            slot_vars.push(vars);
        }

        let mut solver = Self {
            problem,
            slot_vars,
            families: Vec::new(),
            trivially_infeasible: None,
        };
        solver.encode_slot_selection(model);
        solver.encode_protein_counts(model);
        solver.encode_no_consecutive(model);
        solver.encode_fish_dinner_caps(model);
        solver.encode_carb_gating(model);
        solver.encode_carb_frequency(model);
        solver.encode_recipe_reuse(model);

        debug!(
            variables = solver.slot_vars.iter().map(Vec::len).sum::<usize>(),
            families = ?solver.families,
            "scheduling model encoded"
        );
        solver
    }

    /// Runs the solver, optionally bounded by a wall-clock limit. The solve is
    /// single-threaded either way; with a limit it runs on a helper thread so
    /// the driver can give up waiting.
    pub fn solve(self, timeout: Option<Duration>) -> Result<Assignment, PlannerError> {
        let Self {
            problem,
            slot_vars,
            families,
            trivially_infeasible,
        } = self;
        let families = families.join(", ");

        if let Some(reason) = trivially_infeasible {
            return Err(PlannerError::Infeasible(format!("{reason}; applied: {families}")));
        }

        let outcome = match timeout {
            None => problem.solve(),
            Some(limit) => {
                let (tx, rx) = mpsc::channel();
                thread::spawn(move || {
                    let _ = tx.send(problem.solve());
                });
                match rx.recv_timeout(limit) {
                    Ok(result) => result,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        return Err(PlannerError::Timeout(limit.as_secs()));
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        return Err(PlannerError::Solver(
                            "solver thread terminated unexpectedly".to_string(),
                        ));
                    }
                }
            }
        };

        #[allow(clippy::match_wildcard_for_single_variants)]
        match outcome {
            Ok(solution) => {
                info!("solver verdict: feasible");
                Self::extract(&solution, &slot_vars)
            }
            Err(microlp::Error::Infeasible) => {
                info!("solver verdict: infeasible");
                Err(PlannerError::Infeasible(format!("applied: {families}")))
            }
            Err(other) => Err(PlannerError::Solver(format!("{other:?}"))),
        }
    }

    fn extract(
        solution: &microlp::Solution,
        slot_vars: &[Vec<(usize, Variable)>],
    ) -> Result<Assignment, PlannerError> {
        let mut chosen = Vec::with_capacity(slot_vars.len());
        for (slot_idx, vars) in slot_vars.iter().enumerate() {
            let pick = vars
                .iter()
                .find(|&&(_, var)| *solution.var_value(var) > 0.5)
                .map(|&(variant_idx, _)| variant_idx);
            match pick {
                Some(variant_idx) => chosen.push(variant_idx),
                None => {
                    return Err(PlannerError::Internal(format!(
                        "slot {slot_idx} left unassigned by the solver"
                    )));
                }
            }
        }
        Ok(Assignment { chosen })
    }

    /// Selector variables whose variant satisfies the predicate, as unit-
    /// coefficient terms ready for a linear constraint.
    fn terms_matching<F>(&self, model: &SlotModel, mut pred: F) -> Vec<(Variable, f64)>
    where
        F: FnMut(usize, &SlotVariant) -> bool,
    {
        let mut terms = Vec::new();
        for (slot_idx, vars) in self.slot_vars.iter().enumerate() {
            for &(variant_idx, var) in vars {
                if pred(slot_idx, &model.variants[variant_idx]) {
                    terms.push((var, 1.0));
                }
            }
        }
        terms
    }

    fn slot_protein_terms(&self, model: &SlotModel, slot_idx: usize, protein: &str) -> Vec<(Variable, f64)> {
        self.slot_vars[slot_idx]
            .iter()
            .filter(|&&(variant_idx, _)| model.variants[variant_idx].protein == protein)
            .map(|&(_, var)| (var, 1.0))
            .collect()
    }

    fn variant_proteins(model: &SlotModel) -> BTreeSet<String> {
        model.variants.iter().map(|v| v.protein.clone()).collect()
    }

    /// Exactly one variant per slot, plus the redundant week-wide total.
    fn encode_slot_selection(&mut self, model: &SlotModel) {
        let mut all: Vec<(Variable, f64)> = Vec::new();
        for vars in &self.slot_vars {
            let terms: Vec<(Variable, f64)> = vars.iter().map(|&(_, var)| (var, 1.0)).collect();
            all.extend_from_slice(&terms);
            self.problem.add_constraint(&terms, ComparisonOp::Eq, 1.0);
        }
        #[allow(clippy::cast_precision_loss)]
        let slot_count = model.slots.len() as f64;
        self.problem.add_constraint(&all, ComparisonOp::Eq, slot_count);
        self.families.push("slot coverage");
    }

    /// Constraint 1: per-protein weekly totals. Proteins absent from the
    /// rules table are pinned to zero.
    fn encode_protein_counts(&mut self, model: &SlotModel) {
        let mut proteins: BTreeSet<String> = model
            .catalog
            .rules
            .constraints
            .weekly_protein_counts
            .keys()
            .cloned()
            .collect();
        proteins.extend(Self::variant_proteins(model));

        for protein in &proteins {
            let target = model.catalog.rules.weekly_protein_count(protein);
            let terms = self.terms_matching(model, |_, v| v.protein == *protein);
            if terms.is_empty() {
                if target > 0 {
                    self.trivially_infeasible = Some(format!(
                        "protein `{protein}` requires {target} slot(s) but no recipe provides it"
                    ));
                }
                continue;
            }
            self.problem
                .add_constraint(&terms, ComparisonOp::Eq, f64::from(target));
        }
        self.families.push("weekly protein counts");
    }

    /// Constraint 2: adjacent days of the same meal row never repeat a
    /// protein. The week is not circular.
    fn encode_no_consecutive(&mut self, model: &SlotModel) {
        let rules = &model.catalog.rules;
        if !rules.constraints.no_consecutive_same_protein || rules.days.len() < 2 {
            return;
        }

        let mut added = false;
        for meal_idx in 0..rules.meals.len() {
            for protein in &Self::variant_proteins(model) {
                for day_idx in 0..rules.days.len() - 1 {
                    let mut terms =
                        self.slot_protein_terms(model, model.slot_index(day_idx, meal_idx), protein);
                    terms.extend(self.slot_protein_terms(
                        model,
                        model.slot_index(day_idx + 1, meal_idx),
                        protein,
                    ));
                    if terms.len() > 1 {
                        self.problem.add_constraint(&terms, ComparisonOp::Le, 1.0);
                        added = true;
                    }
                }
            }
        }
        if added {
            self.families.push("no consecutive same protein");
        }
    }

    /// Constraints 3 and 4: weekly and sliding-window caps on fish dinners.
    fn encode_fish_dinner_caps(&mut self, model: &SlotModel) {
        let rules = &model.catalog.rules;
        let Some(dinner_idx) = rules.meals.iter().position(|m| m == DINNER_MEAL) else {
            return;
        };

        let per_day: Vec<Vec<(Variable, f64)>> = (0..rules.days.len())
            .map(|day_idx| {
                self.slot_protein_terms(model, model.slot_index(day_idx, dinner_idx), FISH_PROTEIN)
            })
            .collect();
        let weekly: Vec<(Variable, f64)> = per_day.concat();
        if weekly.is_empty() {
            return;
        }

        self.problem.add_constraint(
            &weekly,
            ComparisonOp::Le,
            f64::from(rules.constraints.fish_dinner_max_per_week),
        );
        self.families.push("fish dinner weekly cap");

        let max_consecutive = rules.constraints.fish_dinner_max_consecutive;
        #[allow(clippy::cast_possible_truncation)]
        let window_span = max_consecutive as usize;
        if window_span >= rules.days.len() {
            return;
        }
        let mut added = false;
        for start in 0..rules.days.len() - window_span {
            let window: Vec<(Variable, f64)> = per_day[start..=start + window_span].concat();
            if window.len() > window_span {
                self.problem
                    .add_constraint(&window, ComparisonOp::Le, f64::from(max_consecutive));
                added = true;
            }
        }
        if added {
            self.families.push("fish dinner consecutive cap");
        }
    }

    /// Constraint 5: no carb selection at carb-free meals. The expander never
    /// emits such variants, so this is a safety net over an empty set.
    fn encode_carb_gating(&mut self, model: &SlotModel) {
        let terms = self.terms_matching(model, |slot_idx, v| {
            v.carb.is_some() && !model.catalog.rules.allow_carbs(&model.slots[slot_idx].meal)
        });
        if !terms.is_empty() {
            self.problem.add_constraint(&terms, ComparisonOp::Eq, 0.0);
            self.families.push("meal carb gating");
        }
    }

    /// Constraint 6: floored weekly cap per capped carb ingredient.
    fn encode_carb_frequency(&mut self, model: &SlotModel) {
        let capped: Vec<(String, u32)> = model
            .catalog
            .capped_carbs()
            .map(|(ing, cap)| (ing.id.clone(), cap))
            .collect();

        let mut added = false;
        for (carb_id, cap) in capped {
            let terms =
                self.terms_matching(model, |_, v| v.carb.as_deref() == Some(carb_id.as_str()));
            if terms.is_empty() {
                continue;
            }
            self.problem
                .add_constraint(&terms, ComparisonOp::Le, f64::from(cap));
            added = true;
        }
        if added {
            self.families.push("carb frequency caps");
        }
    }

    /// Constraint 7: cap on uses of each base recipe, summed over all of its
    /// variants and slots.
    fn encode_recipe_reuse(&mut self, model: &SlotModel) {
        let max_uses = model.catalog.rules.constraints.max_recipe_uses_per_week;
        let mut added = false;
        for recipe_idx in 0..model.catalog.recipes.len() {
            let terms = self.terms_matching(model, |_, v| v.recipe_idx == recipe_idx);
            if terms.is_empty() {
                continue;
            }
            self.problem
                .add_constraint(&terms, ComparisonOp::Le, f64::from(max_uses));
            added = true;
        }
        if added {
            self.families.push("recipe reuse limit");
        }
    }
}
