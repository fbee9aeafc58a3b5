//! Chrome DevTools Protocol adapter for the mender engine.

pub mod driver;
pub mod scripts;

pub use driver::{CdpDriver, connect};
