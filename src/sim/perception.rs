//! Container-aware perception
//!
//! Builds the filtered world view an action provider reasons over: the
//! actor's location, the entities it can see (opaque containers hide
//! their contents, transparent slots reveal theirs), a count of hidden
//! entities, and a short rendered history of nearby interactions.

use crate::core::types::{EntityId, LocationId, Tick};
use crate::event::{EventRecord, InteractionStatus};
use crate::interaction::InteractionEngine;
use crate::model::WorldState;
use ahash::AHashSet;

/// One visible entity, as the provider sees it
#[derive(Debug, Clone)]
pub struct EntityView {
    pub id: EntityId,
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LocationView {
    pub id: LocationId,
    pub name: String,
}

/// Rendered line of nearby interaction history
#[derive(Debug, Clone)]
pub struct InteractionView {
    pub tick: Tick,
    pub actor_id: EntityId,
    pub status: InteractionStatus,
    pub text: String,
}

/// Everything a provider gets to see when deciding
#[derive(Debug, Clone, Default)]
pub struct PerceptionSnapshot {
    pub actor_id: EntityId,
    pub location: Option<LocationView>,
    pub entities: Vec<EntityView>,
    /// Entities present at the location but concealed by opaque slots
    pub hidden_entity_count: usize,
    pub interactions: Vec<InteractionView>,
}

/// Stateless view builder; the tick window and record cap come from
/// simulation config.
#[derive(Debug, Clone, Copy)]
pub struct PerceptionSystem {
    pub tick_window: u64,
    pub max_records: usize,
}

impl PerceptionSystem {
    pub fn new(tick_window: u64, max_records: usize) -> Self {
        Self {
            tick_window,
            max_records,
        }
    }

    /// Build the actor's snapshot. An actor with no resolvable location
    /// perceives nothing rather than failing.
    pub fn perceive(
        &self,
        world: &WorldState,
        engine: Option<&InteractionEngine>,
        actor_id: &EntityId,
    ) -> PerceptionSnapshot {
        let mut snapshot = PerceptionSnapshot {
            actor_id: actor_id.clone(),
            ..PerceptionSnapshot::default()
        };

        let Some(location_id) = world.location_of(actor_id) else {
            return snapshot;
        };
        let Some(location) = world.location(&location_id) else {
            return snapshot;
        };
        snapshot.location = Some(LocationView {
            id: location_id.clone(),
            name: location.name.clone(),
        });

        let membership = &location.entities_in_location;

        // Ids concealed inside the containers of same-location entities.
        // The location index lists them too; subtracting yields the
        // top-level layer.
        let mut contained: AHashSet<EntityId> = AHashSet::new();
        for eid in membership {
            if let Some(cc) = world.entity(eid).and_then(|e| e.container()) {
                contained.extend(cc.all_item_ids());
            }
        }

        let mut visible_ids: Vec<EntityId> = Vec::new();
        let mut seen: AHashSet<EntityId> = AHashSet::new();
        let mut frontier: Vec<EntityId> = Vec::new();
        for eid in membership {
            if !contained.contains(eid) && seen.insert(eid.clone()) {
                visible_ids.push(eid.clone());
                frontier.push(eid.clone());
            }
        }

        // Transparent slots of visible containers reveal their items, and
        // the reveal recurses through nested transparent containers.
        while let Some(eid) = frontier.pop() {
            let Some(cc) = world.entity(&eid).and_then(|e| e.container()) else {
                continue;
            };
            for slot in &cc.slots {
                if !slot.config.transparent {
                    continue;
                }
                for item in &slot.items {
                    if seen.insert(item.clone()) {
                        visible_ids.push(item.clone());
                        frontier.push(item.clone());
                    }
                }
            }
        }

        snapshot.hidden_entity_count = membership
            .iter()
            .filter(|eid| !seen.contains(*eid))
            .count();

        snapshot.entities = visible_ids
            .iter()
            .filter_map(|eid| world.entity(eid))
            .map(|e| EntityView {
                id: e.entity_id.clone(),
                name: e.name.clone(),
                tags: e.all_tags(),
            })
            .collect();

        snapshot.interactions = self.visible_interactions(world, engine, actor_id);
        snapshot
    }

    /// Recent interaction attempts at the viewer's location, newest last,
    /// rendered through the matched recipe's narrative templates.
    pub fn visible_interactions(
        &self,
        world: &WorldState,
        engine: Option<&InteractionEngine>,
        viewer_id: &EntityId,
    ) -> Vec<InteractionView> {
        let Some(viewer_loc) = world.location_of(viewer_id) else {
            return Vec::new();
        };
        let min_tick = world.current_tick().saturating_sub(self.tick_window);

        let mut views = Vec::new();
        for rec in world.interaction_log.iter().rev() {
            if rec.tick < min_tick {
                break;
            }
            if rec.location_id.as_ref() != Some(&viewer_loc) {
                continue;
            }

            let actor_text = if &rec.actor_id == viewer_id {
                "You".to_string()
            } else {
                rec.actor_name.clone()
            };
            let recipe = engine.and_then(|e| e.recipe_by_id(&rec.recipe_id));
            let template = match rec.status {
                InteractionStatus::Success => recipe
                    .and_then(|r| r.narrative_success.clone())
                    .unwrap_or_else(|| "{actor} executed {verb} ({target})".to_string()),
                InteractionStatus::Failed => recipe
                    .and_then(|r| r.narrative_fail.clone())
                    .unwrap_or_else(|| {
                        "{actor} attempted {verb} ({target}) but failed: {reason}".to_string()
                    }),
            };
            let reason_text = match rec.reason.as_str() {
                "NO_TARGET" => "Target not found",
                "NO_RECIPE" => "No corresponding interaction rule",
                other => other,
            };
            let text = template
                .replace("{actor}", &actor_text)
                .replace("{verb}", &rec.verb)
                .replace("{target}", &rec.target_name)
                .replace("{reason}", reason_text);

            views.push(InteractionView {
                tick: rec.tick,
                actor_id: rec.actor_id.clone(),
                status: rec.status,
                text,
            });
            if views.len() >= self.max_records {
                break;
            }
        }
        views.reverse();
        views
    }

    /// Raw world events visible from the viewer's location, same window
    /// and cap as interactions.
    pub fn visible_events<'w>(
        &self,
        world: &'w WorldState,
        viewer_id: &EntityId,
    ) -> Vec<&'w EventRecord> {
        let Some(viewer_loc) = world.location_of(viewer_id) else {
            return Vec::new();
        };
        let min_tick = world.current_tick().saturating_sub(self.tick_window);

        let mut records = Vec::new();
        for rec in world.event_log.iter().rev() {
            if rec.tick < min_tick {
                break;
            }
            if rec.location_id.as_ref() != Some(&viewer_loc) {
                continue;
            }
            records.push(rec);
            if records.len() >= self.max_records {
                break;
            }
        }
        records.reverse();
        records
    }
}
