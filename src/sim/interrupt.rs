//! Interrupt rules evaluated by the decision arbiter
//!
//! Rules are checked in ascending priority order; the first one that
//! fires wins and its reason string is handed to the action provider.

use crate::core::types::EntityId;
use crate::model::WorldState;
use serde_json::Value;

pub const DEFAULT_NUTRITION_THRESHOLD: f32 = 50.0;

/// Outcome of one arbitration pass
#[derive(Debug, Clone, PartialEq)]
pub struct InterruptResult {
    pub interrupt: bool,
    pub reason: String,
}

impl InterruptResult {
    pub fn none() -> Self {
        Self {
            interrupt: false,
            reason: String::new(),
        }
    }

    pub fn fire(reason: impl Into<String>) -> Self {
        Self {
            interrupt: true,
            reason: reason.into(),
        }
    }
}

/// One condition that may seize an actor's attention
#[derive(Debug, Clone, PartialEq)]
pub enum InterruptRule {
    /// Fires when the actor has no running task. Conventionally the
    /// lowest-urgency rule (highest priority value) so every other rule
    /// is consulted first.
    Idle { priority: i32 },
    /// Fires when current nutrition drops below the threshold.
    LowNutrition { priority: i32, threshold: f32 },
}

impl InterruptRule {
    /// Lower value = checked (and satisfied) earlier.
    pub fn priority(&self) -> i32 {
        match self {
            InterruptRule::Idle { priority } => *priority,
            InterruptRule::LowNutrition { priority, .. } => *priority,
        }
    }

    /// Parse one data-described rule; unknown kinds are dropped.
    pub fn from_value(value: &Value) -> Option<InterruptRule> {
        let kind = value.get("rule").and_then(Value::as_str)?;
        let priority = value
            .get("priority")
            .and_then(Value::as_i64)
            .map(|p| p as i32);
        match kind {
            "Idle" => Some(InterruptRule::Idle {
                priority: priority.unwrap_or(999),
            }),
            "LowNutrition" => Some(InterruptRule::LowNutrition {
                priority: priority.unwrap_or(10),
                threshold: value
                    .get("threshold")
                    .and_then(Value::as_f64)
                    .map(|t| t as f32)
                    .unwrap_or(DEFAULT_NUTRITION_THRESHOLD),
            }),
            _ => None,
        }
    }

    /// Standard agent ruleset: hunger first, idleness as the fallback.
    pub fn default_ruleset() -> Vec<InterruptRule> {
        vec![
            InterruptRule::LowNutrition {
                priority: 10,
                threshold: DEFAULT_NUTRITION_THRESHOLD,
            },
            InterruptRule::Idle { priority: 999 },
        ]
    }

    /// Evaluate against the current world. Returns the reason string when
    /// the rule fires.
    pub fn evaluate(&self, world: &WorldState, actor_id: &EntityId) -> Option<String> {
        let actor = world.entity(actor_id)?;
        let name = actor.name.clone();
        match self {
            InterruptRule::Idle { .. } => {
                let busy = actor.worker().map(|w| w.has_task()).unwrap_or(false);
                if busy {
                    None
                } else {
                    Some(format!("{name} is idle and has nothing to do"))
                }
            }
            InterruptRule::LowNutrition { threshold, .. } => {
                let creature = actor.creature()?;
                let nutrition = creature.current_nutrition.unwrap_or(creature.max_nutrition);
                if nutrition < *threshold {
                    Some(format!(
                        "{name} is hungry: nutrition {nutrition:.0} is below {threshold:.0}"
                    ))
                } else {
                    None
                }
            }
        }
    }
}

/// Run the ruleset in ascending priority order; first hit wins.
///
/// The caller is expected to pass a pre-sorted ruleset (the arbiter
/// component sorts at construction time).
pub fn check_interrupt(
    world: &WorldState,
    actor_id: &EntityId,
    ruleset: &[InterruptRule],
) -> InterruptResult {
    for rule in ruleset {
        if let Some(reason) = rule.evaluate(world, actor_id) {
            return InterruptResult::fire(reason);
        }
    }
    InterruptResult::none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::component::{self, Component, CreatureComponent, WorkerComponent};
    use crate::model::{Entity, WorldState};
    use serde_json::json;

    fn world_with_agent(nutrition: f32, busy: bool) -> (WorldState, EntityId) {
        let mut world = WorldState::new();
        let mut agent = Entity::new(EntityId::new("beatrice_01"), "beatrice", "Beatrice");
        agent
            .add_component(
                component::CREATURE,
                Component::Creature(CreatureComponent {
                    current_nutrition: Some(nutrition),
                    ..CreatureComponent::default()
                }),
            )
            .unwrap();
        let mut worker = WorkerComponent::default();
        if busy {
            worker.assign_task(crate::core::types::TaskId::new("task_1"));
        }
        agent
            .add_component(component::WORKER, Component::Worker(worker))
            .unwrap();
        let id = agent.entity_id.clone();
        world.register_entity(agent).unwrap();
        (world, id)
    }

    #[test]
    fn test_low_nutrition_preempts_idle() {
        let (world, id) = world_with_agent(30.0, false);
        let result = check_interrupt(&world, &id, &InterruptRule::default_ruleset());
        assert!(result.interrupt);
        assert!(result.reason.contains("hungry"), "{}", result.reason);
    }

    #[test]
    fn test_idle_fires_when_fed_and_unoccupied() {
        let (world, id) = world_with_agent(90.0, false);
        let result = check_interrupt(&world, &id, &InterruptRule::default_ruleset());
        assert!(result.interrupt);
        assert!(result.reason.contains("idle"), "{}", result.reason);
    }

    #[test]
    fn test_no_interrupt_while_working_and_fed() {
        let (world, id) = world_with_agent(90.0, true);
        let result = check_interrupt(&world, &id, &InterruptRule::default_ruleset());
        assert!(!result.interrupt);
    }

    #[test]
    fn test_hunger_fires_even_while_working() {
        let (world, id) = world_with_agent(10.0, true);
        let result = check_interrupt(&world, &id, &InterruptRule::default_ruleset());
        assert!(result.interrupt);
        assert!(result.reason.contains("hungry"));
    }

    #[test]
    fn test_parse_ruleset_from_data() {
        let rule = InterruptRule::from_value(&json!({
            "rule": "LowNutrition",
            "priority": 5,
            "threshold": 25.0,
        }))
        .unwrap();
        assert_eq!(
            rule,
            InterruptRule::LowNutrition {
                priority: 5,
                threshold: 25.0
            }
        );
        assert!(InterruptRule::from_value(&json!({"rule": "FullMoon"})).is_none());
    }
}
