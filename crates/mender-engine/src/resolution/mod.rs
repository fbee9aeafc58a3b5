pub mod context;
pub mod engine;
pub mod hints;
pub mod strategy;
pub mod validation;

pub use context::{DomContext, GatherOptions, LabelInfo};
pub use engine::{ElementResolver, Resolution, Resolved};
pub use strategy::{Strategy, StrategyCatalog, confidence};
pub use validation::{Miss, ProbeOutcome, is_type_compatible, probe};
