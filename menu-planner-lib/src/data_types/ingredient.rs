use core::fmt;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use strum_macros::{EnumCount, EnumIter};

/// Measurement unit of a catalog ingredient. Every quantity attached to an
/// ingredient, whether literal or portion-resolved, is expressed in this unit.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Grams,
    Milliliters,
    Units,
}

impl Unit {
    /// Short symbol used in the JSON artifacts ("g", "ml", "units").
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Grams => "g",
            Unit::Milliliters => "ml",
            Unit::Units => "units",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Shopping-list section. The `Ord` derive follows declaration order, which is
/// the order sections appear in the shopping artifact.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount, Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Protein,
    Carb,
    Vegetable,
    Dairy,
    Fat,
    Condiment,
    Spice,
    Other,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Section::Protein => "protein",
            Section::Carb => "carb",
            Section::Vegetable => "vegetable",
            Section::Dairy => "dairy",
            Section::Fat => "fat",
            Section::Condiment => "condiment",
            Section::Spice => "spice",
            Section::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// Scheduling-relevant classification of an ingredient, independent of the
/// shopping section it is displayed under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, EnumCount, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientKind {
    Protein,
    Carb,
    Other,
}

/// One entry of the canonical ingredient catalog.
///
/// `default_qty` and `max_times_week` are only meaningful for carb-kind
/// ingredients; the loader rejects them elsewhere. `max_times_week` may be
/// fractional (e.g. 0.5); the scheduler applies the floored weekly cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub unit: Unit,
    pub section: Section,
    pub kind: IngredientKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_qty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_times_week: Option<f64>,
}

impl Ingredient {
    /// Floored weekly usage cap for carb ingredients, `None` when unlimited.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn weekly_cap(&self) -> Option<u32> {
        self.max_times_week.map(|m| m.floor() as u32)
    }

    /// Whether the declared cap loses information under floor semantics.
    #[must_use]
    pub fn has_fractional_cap(&self) -> bool {
        self.max_times_week.is_some_and(|m| m.fract() != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carb(id: &str, max_times_week: Option<f64>) -> Ingredient {
        Ingredient {
            id: id.to_string(),
            name: id.to_string(),
            unit: Unit::Grams,
            section: Section::Carb,
            kind: IngredientKind::Carb,
            default_qty: None,
            max_times_week,
        }
    }

    #[test]
    fn test_unit_symbols() {
        assert_eq!(Unit::Grams.symbol(), "g");
        assert_eq!(Unit::Milliliters.symbol(), "ml");
        assert_eq!(Unit::Units.symbol(), "units");
        assert_eq!(Unit::Grams.to_string(), "g");
    }

    #[test]
    fn test_section_order_matches_artifact_order() {
        let mut sections = vec![
            Section::Other,
            Section::Spice,
            Section::Carb,
            Section::Protein,
            Section::Vegetable,
        ];
        sections.sort();
        assert_eq!(
            sections,
            vec![
                Section::Protein,
                Section::Carb,
                Section::Vegetable,
                Section::Spice,
                Section::Other,
            ]
        );
    }

    #[test]
    fn test_weekly_cap_floors_fractional_values() {
        assert_eq!(carb("rice", Some(3.0)).weekly_cap(), Some(3));
        assert_eq!(carb("platano_maduro", Some(0.5)).weekly_cap(), Some(0));
        assert_eq!(carb("pasta", None).weekly_cap(), None);
    }

    #[test]
    fn test_fractional_cap_detection() {
        assert!(carb("platano_maduro", Some(0.5)).has_fractional_cap());
        assert!(!carb("rice", Some(3.0)).has_fractional_cap());
        assert!(!carb("pasta", None).has_fractional_cap());
    }

    #[test]
    fn test_ingredient_yaml_round_trip() {
        let yaml = "id: rice\nname: Arroz\nunit: grams\nsection: carb\nkind: carb\nmax_times_week: 3\n";
        let parsed: Ingredient = serde_yaml::from_str(yaml).expect("valid ingredient");
        assert_eq!(parsed.unit, Unit::Grams);
        assert_eq!(parsed.section, Section::Carb);
        assert_eq!(parsed.kind, IngredientKind::Carb);
        assert_eq!(parsed.max_times_week, Some(3.0));
        assert_eq!(parsed.default_qty, None);
    }

    #[test]
    fn test_ingredient_rejects_unknown_fields() {
        let yaml = "id: rice\nname: Arroz\nunit: grams\nsection: carb\nkind: carb\ncolour: white\n";
        assert!(serde_yaml::from_str::<Ingredient>(yaml).is_err());
    }
}
