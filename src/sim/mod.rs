//! The simulation engine: scheduler, perception, decisions, task work

pub mod decision;
pub mod interrupt;
pub mod manager;
pub mod perception;
pub mod worker;

pub use manager::{SimulationContext, WorldManager};
pub use perception::{PerceptionSnapshot, PerceptionSystem};
