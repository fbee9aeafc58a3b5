pub mod config;
pub mod driver;
pub mod engine;
pub mod healing;
pub mod metrics;
pub mod resolution;
pub mod selector;
pub mod store;
pub mod synthesis;

pub use engine::Mender;
pub use mender_common::{error, intent, pattern, protocol};
