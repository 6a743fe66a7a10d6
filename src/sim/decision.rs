//! Decision phase of the scheduler step
//!
//! Arbitration decides WHETHER the actor acts (and why); the routed
//! action provider decides WHAT it does. An interrupt firing while the
//! actor is working pauses the running task before the provider is even
//! consulted, so the provider always decides from a free state.

use crate::core::types::EntityId;
use crate::effect::Effect;
use crate::event::{Event, InteractionStatus};
use crate::executor::EffectContext;
use crate::interaction::Resolution;
use crate::model::WorldState;
use tracing::{debug, trace};

use super::interrupt::check_interrupt;
use super::manager::SimulationContext;

pub fn controller_tick(
    world: &mut WorldState,
    ctx: &SimulationContext<'_>,
    actor_id: &EntityId,
    events: &mut Vec<Event>,
) {
    let Some(actor) = world.entity(actor_id) else {
        return;
    };
    let Some((kind, control)) = actor.resolve_enabled_controller() else {
        return;
    };
    let Some(arbiter) = actor.arbiter() else {
        return;
    };

    let result = check_interrupt(world, actor_id, &arbiter.ruleset);
    if !result.interrupt {
        return;
    }
    trace!(actor = %actor_id, reason = %result.reason, "interrupt fired");

    let provider_id = if control.provider_id.is_empty() {
        kind.default_provider_id().to_string()
    } else {
        control.provider_id.clone()
    };

    // Seizing attention means releasing the current task first. The task
    // stays paused in the world index; nothing resumes it automatically.
    let held_task = world
        .entity(actor_id)
        .and_then(|e| e.worker())
        .and_then(|w| w.current_task_id.clone());
    if let Some(task_id) = held_task {
        let mut pause_ctx = EffectContext::for_actor(actor_id).with_task(task_id.clone());
        events.extend(ctx.execute(
            world,
            &Effect::UpdateTaskStatus {
                task_id: Some(task_id.clone()),
                status: "Paused".to_string(),
            },
            &mut pause_ctx,
        ));
        if let Some(worker) = world.entity_mut(actor_id).and_then(|e| e.worker_mut()) {
            worker.stop_task();
        }
        let interrupted = Event::TaskInterrupted {
            task_id,
            reason: result.reason.clone(),
        };
        world.record_event(interrupted.clone(), Some(actor_id));
        events.push(interrupted);
    }

    // An unknown routing key freezes the actor; acting through the wrong
    // provider would be worse than not acting.
    let Some(provider) = ctx.provider_for(&provider_id) else {
        debug!(actor = %actor_id, provider = %provider_id, "no provider resolved");
        return;
    };

    let mut actions_taken = 0u32;
    loop {
        if world
            .entity(actor_id)
            .and_then(|e| e.worker())
            .map(|w| w.has_task())
            .unwrap_or(false)
        {
            return;
        }

        // Each round re-arbitrates so the reason tracks the world the
        // previous action just changed.
        let Some(arbiter) = world.entity(actor_id).and_then(|e| e.arbiter()) else {
            return;
        };
        let ruleset = arbiter.ruleset.clone();
        let result = check_interrupt(world, actor_id, &ruleset);
        if !result.interrupt {
            return;
        }

        let perception = ctx.perception.perceive(world, Some(ctx.engine), actor_id);
        let actions = provider.decide(&perception, &result.reason, actor_id);
        if actions.is_empty() {
            return;
        }

        for action in &actions {
            match ctx.engine.process_command(world, action) {
                Resolution::Failed(reason) => {
                    world.record_interaction_attempt(
                        actor_id,
                        &action.verb,
                        &action.target_id,
                        InteractionStatus::Failed,
                        reason.code(),
                        "",
                    );
                    // A failed action ends the actor's turn; retrying the
                    // same doomed command would burn the whole budget.
                    return;
                }
                Resolution::Success { recipe, effects } => {
                    world.record_interaction_attempt(
                        actor_id,
                        &action.verb,
                        &action.target_id,
                        InteractionStatus::Success,
                        "",
                        &recipe.recipe_id,
                    );
                    let mut effect_ctx = EffectContext::for_actor(actor_id)
                        .with_id("target", action.target_id.clone());
                    effect_ctx.recipe = Some(recipe);
                    for raw in &effects {
                        let effect = Effect::from_value(raw);
                        events.extend(ctx.execute(world, &effect, &mut effect_ctx));
                    }
                }
            }

            // Acquiring a task hands action rights to the worker phase.
            if world
                .entity(actor_id)
                .and_then(|e| e.worker())
                .map(|w| w.has_task())
                .unwrap_or(false)
            {
                return;
            }

            actions_taken += 1;
            if actions_taken >= ctx.config.max_actions_per_tick {
                debug!(actor = %actor_id, "action ceiling reached");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::LocationId;
    use crate::data::TemplateDef;
    use crate::executor::WorldExecutor;
    use crate::interaction::{Action, InteractionEngine};
    use crate::model::component::{
        self, Component, ControlComponent, CreatureComponent, DecisionArbiterComponent,
        TagComponent, WorkerComponent,
    };
    use crate::model::{Entity, Location};
    use crate::progress::ProgressorRegistry;
    use crate::providers::ActionProvider;
    use crate::sim::interrupt::InterruptRule;
    use crate::sim::perception::{PerceptionSnapshot, PerceptionSystem};
    use ahash::AHashMap;
    use serde_json::json;

    struct EatEverything;
    impl ActionProvider for EatEverything {
        fn decide(
            &self,
            perception: &PerceptionSnapshot,
            _reason: &str,
            actor_id: &EntityId,
        ) -> Vec<Action> {
            perception
                .entities
                .iter()
                .filter(|e| &e.id != actor_id && e.tags.iter().any(|t| t == "edible"))
                .take(1)
                .map(|e| Action::new("Consume", e.id.clone()))
                .collect()
        }
    }

    struct Stubborn;
    impl ActionProvider for Stubborn {
        fn decide(
            &self,
            _perception: &PerceptionSnapshot,
            _reason: &str,
            _actor_id: &EntityId,
        ) -> Vec<Action> {
            vec![Action::new("Consume", EntityId::new("ghost_item"))]
        }
    }

    fn consume_engine() -> InteractionEngine {
        let mut db = serde_json::Map::new();
        db.insert(
            "consume_edible".to_string(),
            json!({
                "verb": "Consume",
                "target_tags": ["edible"],
                "outputs": [
                    {"effect": "ModifyProperty", "target": "agent",
                     "component": "CreatureComponent",
                     "property": "current_nutrition", "change": 30.0},
                    {"effect": "DestroyEntity", "target": "target"},
                ],
            }),
        );
        InteractionEngine::from_recipe_db(&db)
    }

    fn hungry_world() -> WorldState {
        let mut world = WorldState::new();
        world
            .register_location(Location::new(LocationId::new("bedroom"), "Bedroom"))
            .unwrap();
        let mut agent = Entity::new(EntityId::new("beatrice_01"), "beatrice", "Beatrice");
        agent
            .add_component(
                component::CREATURE,
                Component::Creature(CreatureComponent {
                    current_nutrition: Some(20.0),
                    ..CreatureComponent::default()
                }),
            )
            .unwrap();
        agent
            .add_component(
                component::AGENT_CONTROL,
                Component::AgentControl(ControlComponent::default()),
            )
            .unwrap();
        agent
            .add_component(
                component::DECISION_ARBITER,
                Component::DecisionArbiter(DecisionArbiterComponent::new(vec![
                    InterruptRule::LowNutrition {
                        priority: 10,
                        threshold: 50.0,
                    },
                ])),
            )
            .unwrap();
        agent
            .add_component(component::WORKER, Component::Worker(WorkerComponent::default()))
            .unwrap();
        world.register_entity(agent).unwrap();
        world.ensure_entity_in_location(&"beatrice_01".into(), &LocationId::new("bedroom"));

        for id in ["apple_1", "apple_2"] {
            let mut apple = Entity::new(EntityId::new(id), "apple", "Apple");
            apple
                .add_component(
                    component::TAG,
                    Component::Tag(TagComponent {
                        tags: vec!["edible".to_string()],
                    }),
                )
                .unwrap();
            world.register_entity(apple).unwrap();
            world.ensure_entity_in_location(&id.into(), &LocationId::new("bedroom"));
        }
        world
    }

    struct Harness {
        executor: WorldExecutor,
        engine: InteractionEngine,
        perception: PerceptionSystem,
        progressors: ProgressorRegistry,
        providers: AHashMap<String, Box<dyn ActionProvider>>,
        config: SimulationConfig,
        default_provider: Box<dyn ActionProvider>,
    }

    impl Harness {
        fn new(default_provider: Box<dyn ActionProvider>) -> Self {
            Self {
                executor: WorldExecutor::new(AHashMap::<String, TemplateDef>::new()),
                engine: consume_engine(),
                perception: PerceptionSystem::new(10, 20),
                progressors: ProgressorRegistry::new(),
                providers: AHashMap::new(),
                config: SimulationConfig::default(),
                default_provider,
            }
        }

        fn ctx(&self) -> SimulationContext<'_> {
            SimulationContext {
                executor: &self.executor,
                engine: &self.engine,
                perception: &self.perception,
                progressors: &self.progressors,
                default_provider: Some(self.default_provider.as_ref()),
                providers: &self.providers,
                config: &self.config,
            }
        }
    }

    #[test]
    fn test_hungry_agent_eats_until_sated() {
        let mut world = hungry_world();
        let harness = Harness::new(Box::new(EatEverything));
        let mut events = Vec::new();
        controller_tick(&mut world, &harness.ctx(), &"beatrice_01".into(), &mut events);

        // 20 -> 50 after one apple: threshold no longer undershot, loop ends
        let agent = world.entity(&"beatrice_01".into()).unwrap();
        assert_eq!(
            agent.creature().unwrap().current_nutrition,
            Some(50.0)
        );
        assert!(world.entity(&"apple_1".into()).is_none());
        assert!(world.entity(&"apple_2".into()).is_some());
        assert_eq!(world.interaction_log.len(), 1);
        assert_eq!(world.interaction_log[0].status, InteractionStatus::Success);
    }

    #[test]
    fn test_failed_action_ends_turn_and_is_logged() {
        let mut world = hungry_world();
        let harness = Harness::new(Box::new(Stubborn));
        let mut events = Vec::new();
        controller_tick(&mut world, &harness.ctx(), &"beatrice_01".into(), &mut events);

        assert_eq!(world.interaction_log.len(), 1);
        assert_eq!(world.interaction_log[0].status, InteractionStatus::Failed);
        assert_eq!(world.interaction_log[0].reason, "NO_TARGET");
        // apples untouched
        assert!(world.entity(&"apple_1".into()).is_some());
    }

    #[test]
    fn test_no_interrupt_means_no_action() {
        let mut world = hungry_world();
        if let Some(c) = world
            .entity_mut(&"beatrice_01".into())
            .unwrap()
            .creature_mut()
        {
            c.current_nutrition = Some(90.0);
        }
        let harness = Harness::new(Box::new(EatEverything));
        let mut events = Vec::new();
        controller_tick(&mut world, &harness.ctx(), &"beatrice_01".into(), &mut events);
        assert!(events.is_empty());
        assert!(world.interaction_log.is_empty());
    }

    #[test]
    fn test_disabled_controller_freezes_actor() {
        let mut world = hungry_world();
        if let Some(Component::AgentControl(c)) = world
            .entity_mut(&"beatrice_01".into())
            .unwrap()
            .component_mut(component::AGENT_CONTROL)
        {
            c.enabled = false;
        }
        let harness = Harness::new(Box::new(EatEverything));
        let mut events = Vec::new();
        controller_tick(&mut world, &harness.ctx(), &"beatrice_01".into(), &mut events);
        assert!(events.is_empty());
        assert!(world.entity(&"apple_1".into()).is_some());
    }

    #[test]
    fn test_interrupt_pauses_running_task_before_decision() {
        let mut world = hungry_world();
        let mut task = crate::model::Task::new("Dig", EntityId::new("apple_1"));
        task.status = crate::model::TaskStatus::InProgress;
        let task_id = task.task_id.clone();
        world.register_task(task).unwrap();
        world
            .entity_mut(&"beatrice_01".into())
            .unwrap()
            .worker_mut()
            .unwrap()
            .assign_task(task_id.clone());

        let harness = Harness::new(Box::new(EatEverything));
        let mut events = Vec::new();
        controller_tick(&mut world, &harness.ctx(), &"beatrice_01".into(), &mut events);

        assert_eq!(
            world.task(&task_id).unwrap().status,
            crate::model::TaskStatus::Paused
        );
        assert!(events.iter().any(|e| matches!(e, Event::TaskInterrupted { .. })));
        // after the pause the agent still got to eat
        assert!(world.entity(&"apple_1".into()).is_none());
    }
}
