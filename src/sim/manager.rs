//! The per-tick scheduler
//!
//! `WorldManager` owns the world and every subsystem, advances the
//! clock, and visits each entity once per step: task work first, then
//! decision making. `SimulationContext` is the borrowed bundle of
//! subsystems handed down to the per-entity phases; its `execute` is the
//! gateway that both applies an effect and records the resulting events.

use crate::core::config::SimulationConfig;
use crate::core::error::BuildError;
use crate::core::types::EntityId;
use crate::data::DataBundle;
use crate::data::builder::build_world_state;
use crate::effect::Effect;
use crate::event::Event;
use crate::executor::{EffectContext, WorldExecutor};
use crate::interaction::InteractionEngine;
use crate::model::WorldState;
use crate::progress::ProgressorRegistry;
use crate::providers::ActionProvider;
use crate::sim::perception::PerceptionSystem;
use ahash::AHashMap;
use tracing::info;

/// Borrowed subsystem bundle for one scheduler step
pub struct SimulationContext<'a> {
    pub executor: &'a WorldExecutor,
    pub engine: &'a InteractionEngine,
    pub perception: &'a PerceptionSystem,
    pub progressors: &'a ProgressorRegistry,
    pub default_provider: Option<&'a dyn ActionProvider>,
    pub providers: &'a AHashMap<String, Box<dyn ActionProvider>>,
    pub config: &'a SimulationConfig,
}

impl<'a> SimulationContext<'a> {
    /// Apply one effect and record every produced event into the world
    /// log under the context's actor. Returns the events for the caller's
    /// step buffer.
    pub fn execute(
        &self,
        world: &mut WorldState,
        effect: &Effect,
        ctx: &mut EffectContext,
    ) -> Vec<Event> {
        let events = self.executor.execute(world, effect, ctx);
        let actor = ctx.actor_id().cloned();
        for event in &events {
            world.record_event(event.clone(), actor.as_ref());
        }
        events
    }

    /// Resolve a provider routing key. An empty key means the scheduler
    /// default; an unknown key resolves to nothing, which freezes the
    /// actor rather than handing it to the wrong brain.
    pub fn provider_for(&self, provider_id: &str) -> Option<&'a dyn ActionProvider> {
        if provider_id.is_empty() {
            return self.default_provider;
        }
        self.providers.get(provider_id).map(|b| b.as_ref())
    }
}

/// Owns the world and drives it forward
pub struct WorldManager {
    pub world: WorldState,
    executor: WorldExecutor,
    engine: InteractionEngine,
    perception: PerceptionSystem,
    progressors: ProgressorRegistry,
    default_provider: Option<Box<dyn ActionProvider>>,
    providers: AHashMap<String, Box<dyn ActionProvider>>,
    config: SimulationConfig,
    is_running: bool,
}

impl WorldManager {
    /// Assemble a manager from a loaded data bundle.
    pub fn from_bundle(bundle: DataBundle, config: SimulationConfig) -> Result<Self, BuildError> {
        let world = build_world_state(&bundle.world, &bundle.entity_templates)?;
        let engine = InteractionEngine::from_recipe_db(&bundle.recipes);
        let executor = WorldExecutor::new(bundle.entity_templates);
        let perception = PerceptionSystem::new(
            config.perception_tick_window,
            config.perception_max_records,
        );
        Ok(Self {
            world,
            executor,
            engine,
            perception,
            progressors: ProgressorRegistry::new(),
            default_provider: None,
            providers: AHashMap::new(),
            config,
            is_running: false,
        })
    }

    /// Assemble a manager around an already-built world (tests mostly).
    pub fn new(world: WorldState, engine: InteractionEngine, config: SimulationConfig) -> Self {
        let perception = PerceptionSystem::new(
            config.perception_tick_window,
            config.perception_max_records,
        );
        Self {
            world,
            executor: WorldExecutor::default(),
            engine,
            perception,
            progressors: ProgressorRegistry::new(),
            default_provider: None,
            providers: AHashMap::new(),
            config,
            is_running: false,
        }
    }

    pub fn with_executor(mut self, executor: WorldExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_default_provider(mut self, provider: Box<dyn ActionProvider>) -> Self {
        self.default_provider = Some(provider);
        self
    }

    pub fn register_provider(&mut self, provider_id: impl Into<String>, provider: Box<dyn ActionProvider>) {
        self.providers.insert(provider_id.into(), provider);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn engine(&self) -> &InteractionEngine {
        &self.engine
    }

    pub fn perception(&self) -> &PerceptionSystem {
        &self.perception
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Request a stop; honored at the next tick boundary.
    pub fn stop(&mut self) {
        self.is_running = false;
    }

    /// One scheduler step: advance the clock, then give every entity its
    /// turn in stable insertion order. Task progress runs before decision
    /// making so a task finishing this tick frees the actor to decide.
    pub fn step(&mut self) -> Vec<Event> {
        let ticks = u64::from(self.config.ticks_per_step.max(1));
        self.world.game_time.advance_ticks(ticks);

        let mut events = Vec::new();
        let tick_event = Event::TickAdvanced {
            total_ticks: self.world.game_time.total_ticks,
            time: self.world.game_time.time_to_string(),
        };
        self.world.record_event(tick_event.clone(), None);
        events.push(tick_event);

        let ctx = SimulationContext {
            executor: &self.executor,
            engine: &self.engine,
            perception: &self.perception,
            progressors: &self.progressors,
            default_provider: self.default_provider.as_deref(),
            providers: &self.providers,
            config: &self.config,
        };

        // Snapshot of the roster; entities created mid-step wait for the
        // next step.
        let roster: Vec<EntityId> = self.world.entity_ids().to_vec();
        for actor_id in &roster {
            if self.world.entity(actor_id).is_none() {
                continue;
            }
            super::worker::worker_tick(&mut self.world, &ctx, actor_id, ticks, &mut events);
            if self.world.entity(actor_id).is_none() {
                continue;
            }
            super::decision::controller_tick(&mut self.world, &ctx, actor_id, &mut events);
        }

        events
    }

    /// Run until the clock reaches `max_ticks` or `stop()` is called.
    pub fn run(&mut self, max_ticks: u64) -> Vec<Event> {
        self.is_running = true;
        info!(max_ticks, "simulation started");
        let mut events = Vec::new();
        while self.is_running && self.world.game_time.total_ticks < max_ticks {
            events.extend(self.step());
        }
        self.is_running = false;
        info!(
            ticks = self.world.game_time.total_ticks,
            events = events.len(),
            "simulation finished"
        );
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, Location};
    use crate::core::types::LocationId;

    fn empty_manager() -> WorldManager {
        let mut world = WorldState::new();
        world
            .register_location(Location::new(LocationId::new("bedroom"), "Bedroom"))
            .unwrap();
        world
            .register_entity(Entity::new(EntityId::new("rock_1"), "rock", "Rock"))
            .unwrap();
        world.ensure_entity_in_location(&"rock_1".into(), &LocationId::new("bedroom"));
        WorldManager::new(world, InteractionEngine::default(), SimulationConfig::default())
    }

    #[test]
    fn test_step_advances_clock_and_records_tick() {
        let mut manager = empty_manager();
        let events = manager.step();
        assert_eq!(manager.world.game_time.total_ticks, 1);
        assert!(matches!(events[0], Event::TickAdvanced { total_ticks: 1, .. }));
        assert_eq!(manager.world.event_log.len(), 1);
    }

    #[test]
    fn test_run_stops_at_max_ticks() {
        let mut manager = empty_manager();
        manager.run(5);
        assert_eq!(manager.world.game_time.total_ticks, 5);
        assert!(!manager.is_running());
    }

    #[test]
    fn test_uncontrolled_entities_are_inert() {
        let mut manager = empty_manager();
        let events = manager.run(3);
        // only clock events: the rock has no worker and no controller
        assert!(events.iter().all(|e| matches!(e, Event::TickAdvanced { .. })));
    }
}
