mod catalog;
mod ingredient;
mod plan;
mod recipe;
mod rules;

pub use catalog::*;
pub use ingredient::*;
pub use plan::*;
pub use recipe::*;
pub use rules::*;
