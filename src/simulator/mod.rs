//! Simulated update source
//!
//! Produces new score versions on its own schedule and hands them to the
//! hub. The broadcast machinery doesn't depend on this module.

pub mod delivery;
pub mod runner;

pub use delivery::{next_delivery, ALL_OUT};
pub use runner::{MatchSimulator, SimulatorConfig};
