//! World data model: entities, components, locations, tasks, time

pub mod component;
pub mod container;
pub mod entity;
pub mod location;
pub mod task;
pub mod time;
pub mod world;

pub use entity::Entity;
pub use location::Location;
pub use task::{Task, TaskStatus};
pub use world::WorldState;
