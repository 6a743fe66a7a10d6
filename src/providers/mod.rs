//! Action providers: the pluggable "brains" behind controlled entities
//!
//! The scheduler hands a provider a perception snapshot and the interrupt
//! reason that woke the actor; the provider answers with zero or more
//! actions. Providers never touch the world directly.

use crate::core::types::EntityId;
use crate::interaction::Action;
use crate::sim::perception::PerceptionSnapshot;

pub trait ActionProvider: Send + Sync {
    fn decide(
        &self,
        perception: &PerceptionSnapshot,
        reason: &str,
        actor_id: &EntityId,
    ) -> Vec<Action>;
}

/// Scripted needs-driven policy used by the demo harness.
///
/// Hungry actors eat the first edible thing in sight; idle actors put
/// themselves to sleep, which parks them in a task until it completes.
#[derive(Debug, Default)]
pub struct SimplePolicyProvider;

impl ActionProvider for SimplePolicyProvider {
    fn decide(
        &self,
        perception: &PerceptionSnapshot,
        reason: &str,
        actor_id: &EntityId,
    ) -> Vec<Action> {
        if reason.contains("hungry") {
            let edible = perception
                .entities
                .iter()
                .find(|e| &e.id != actor_id && e.tags.iter().any(|t| t == "edible"));
            if let Some(food) = edible {
                return vec![Action::new("Consume", food.id.clone())];
            }
            // nothing to eat in sight; fall through to resting
        }

        if reason.contains("idle") || reason.contains("hungry") {
            return vec![Action::new("Sleep", actor_id.clone())];
        }

        Vec::new()
    }
}
