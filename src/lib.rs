//! hollowden - data-driven sandbox world simulation core
//!
//! A tick-based simulation where every behavior is authored as data:
//! entity templates, interaction recipes, effect lists, interrupt rules.
//! The engine interprets that data through a single effect executor so
//! the world can only change in auditable, replayable steps.

pub mod core;
pub mod data;
pub mod effect;
pub mod event;
pub mod executor;
pub mod interaction;
pub mod model;
pub mod progress;
pub mod providers;
pub mod sim;

pub use crate::core::config::SimulationConfig;
pub use crate::core::types::{EntityId, LocationId, TaskId, Tick};
pub use crate::effect::Effect;
pub use crate::event::Event;
pub use crate::executor::{EffectContext, WorldExecutor};
pub use crate::interaction::{Action, InteractionEngine};
pub use crate::model::WorldState;
pub use crate::sim::WorldManager;
