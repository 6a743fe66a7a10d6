//! Task progressors
//!
//! A progressor owns the algorithm; the task carries the parameters.
//! Registered by id, with `Linear` as the fallback for unknown or empty
//! ids.

use crate::core::types::EntityId;
use crate::model::{Task, WorldState};
use ahash::AHashMap;
use serde_json::Value;

/// Strategy computing the per-tick progress delta for a task
pub trait Progressor: Send + Sync {
    fn progressor_id(&self) -> &'static str;

    fn compute_progress_delta(
        &self,
        world: &WorldState,
        actor_id: &EntityId,
        task: &Task,
        ticks: u64,
    ) -> f32;
}

/// `(base_per_tick + Σ contributor_property × multiplier) × ticks`
///
/// Contributors name a component and numeric property on the acting
/// actor. A vanished actor contributes nothing: the delta is 0.0, not an
/// error, so a task can outlive its worker until something interrupts it.
#[derive(Debug, Default)]
pub struct LinearProgressor;

impl Progressor for LinearProgressor {
    fn progressor_id(&self) -> &'static str {
        "Linear"
    }

    fn compute_progress_delta(
        &self,
        world: &WorldState,
        actor_id: &EntityId,
        task: &Task,
        ticks: u64,
    ) -> f32 {
        let Some(actor) = world.entity(actor_id) else {
            return 0.0;
        };

        let params = &task.progressor_params;
        let base = params
            .get("base_progress_per_tick")
            .and_then(Value::as_f64)
            .unwrap_or(1.0) as f32;

        let mut delta = base;
        if let Some(contributors) = params.get("progress_contributors").and_then(Value::as_array) {
            for c in contributors {
                let comp_name = c.get("component").and_then(Value::as_str).unwrap_or("");
                let prop_name = c.get("property").and_then(Value::as_str).unwrap_or("");
                let multiplier = c.get("multiplier").and_then(Value::as_f64).unwrap_or(1.0) as f32;
                let value = actor
                    .component(comp_name)
                    .and_then(|comp| comp.numeric_property(prop_name))
                    .unwrap_or(0.0);
                delta += value * multiplier;
            }
        }

        delta * ticks as f32
    }
}

/// Progressor table keyed by id; `Linear` is always present
#[derive(Default)]
pub struct ProgressorRegistry {
    by_id: AHashMap<String, Box<dyn Progressor>>,
    fallback: LinearProgressor,
}

impl ProgressorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, progressor: Box<dyn Progressor>) {
        self.by_id
            .insert(progressor.progressor_id().to_string(), progressor);
    }

    /// Lookup with `Linear` fallback for empty or unknown ids.
    pub fn get(&self, progressor_id: &str) -> &dyn Progressor {
        self.by_id
            .get(progressor_id.trim())
            .map(|b| b.as_ref())
            .unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::component::{self, Component, CreatureComponent};
    use crate::model::Entity;
    use serde_json::json;

    fn sleep_task(params: serde_json::Map<String, Value>) -> Task {
        let mut task = Task::new("Sleep", EntityId::new("beatrice_01"));
        task.required_progress = 60.0;
        task.progressor_params = params;
        task
    }

    fn world_with_actor() -> WorldState {
        let mut world = WorldState::new();
        let mut actor = Entity::new(EntityId::new("beatrice_01"), "beatrice", "Beatrice");
        actor
            .add_component(
                component::CREATURE,
                Component::Creature(CreatureComponent {
                    current_energy: Some(40.0),
                    ..CreatureComponent::default()
                }),
            )
            .unwrap();
        world.register_entity(actor).unwrap();
        world
    }

    #[test]
    fn test_linear_base_times_ticks() {
        let world = world_with_actor();
        let mut params = serde_json::Map::new();
        params.insert("base_progress_per_tick".to_string(), json!(2.5));
        let task = sleep_task(params);

        let delta =
            LinearProgressor.compute_progress_delta(&world, &EntityId::new("beatrice_01"), &task, 4);
        assert_eq!(delta, 10.0);
    }

    #[test]
    fn test_linear_contributors_read_actor_properties() {
        let world = world_with_actor();
        let mut params = serde_json::Map::new();
        params.insert("base_progress_per_tick".to_string(), json!(1.0));
        params.insert(
            "progress_contributors".to_string(),
            json!([{"component": "CreatureComponent",
                    "property": "current_energy",
                    "multiplier": 0.1}]),
        );
        let task = sleep_task(params);

        let delta =
            LinearProgressor.compute_progress_delta(&world, &EntityId::new("beatrice_01"), &task, 1);
        assert_eq!(delta, 5.0);
    }

    #[test]
    fn test_missing_actor_yields_zero() {
        let world = WorldState::new();
        let task = sleep_task(serde_json::Map::new());
        let delta =
            LinearProgressor.compute_progress_delta(&world, &EntityId::new("ghost"), &task, 3);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_registry_falls_back_to_linear() {
        let registry = ProgressorRegistry::new();
        assert_eq!(registry.get("").progressor_id(), "Linear");
        assert_eq!(registry.get("Photosynthesis").progressor_id(), "Linear");
        assert_eq!(registry.get("Linear").progressor_id(), "Linear");
    }
}
