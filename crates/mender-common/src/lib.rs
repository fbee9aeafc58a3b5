pub mod error;
pub mod intent;
pub mod pattern;
pub mod protocol;

pub use error::{DriverError, ParseError, StoreError};
pub use intent::{ElementType, Intent};
pub use pattern::{LearnedPattern, PatternFilter, PatternId, PatternQuery, ScoredPattern};
pub use protocol::{
    ActionKind, Candidate, HealingAction, HealingResult, Provenance, ResolutionResult, Uniqueness,
};
