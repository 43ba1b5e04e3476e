pub mod portion_resolver;
pub mod schedule_solver;
pub mod shopping_aggregator;
pub mod slot_model;
pub mod variant_expander;
