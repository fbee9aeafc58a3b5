pub mod alternatives;
pub mod executor;

pub use executor::{HealError, HealingExecutor};
