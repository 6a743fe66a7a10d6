//! World state: the aggregate root
//!
//! Owns every canonical collection (entities, locations, tasks, logs).
//! Everything else in the crate holds ids and resolves through this
//! struct. Mutation goes through the effect executor; the methods here are
//! invariant-preserving primitives, not a public write API.

use crate::core::error::BuildError;
use crate::core::types::{EntityId, LocationId, TaskId, Tick};
use crate::event::{Event, EventRecord, InteractionRecord, InteractionStatus};
use ahash::{AHashMap, AHashSet};

use super::entity::Entity;
use super::location::Location;
use super::task::Task;
use super::time::GameTime;

/// Single source of truth for the simulated world
#[derive(Debug, Default)]
pub struct WorldState {
    pub game_time: GameTime,

    entities: AHashMap<EntityId, Entity>,
    /// Insertion order of entities; the scheduler iterates this so a given
    /// snapshot always replays identically.
    entity_order: Vec<EntityId>,
    locations: AHashMap<LocationId, Location>,
    location_order: Vec<LocationId>,
    tasks: AHashMap<TaskId, Task>,

    /// World event log (observation/replay/debug)
    pub event_log: Vec<EventRecord>,
    event_seq: u64,
    /// Interaction/recipe level log (readable event stream for planners)
    pub interaction_log: Vec<InteractionRecord>,
    interaction_seq: u64,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> Tick {
        self.game_time.total_ticks
    }

    // --- Registration ---

    pub fn register_entity(&mut self, entity: Entity) -> Result<(), BuildError> {
        if self.entities.contains_key(&entity.entity_id) {
            return Err(BuildError::DuplicateEntityId(entity.entity_id.to_string()));
        }
        self.entity_order.push(entity.entity_id.clone());
        self.entities.insert(entity.entity_id.clone(), entity);
        Ok(())
    }

    pub fn register_location(&mut self, location: Location) -> Result<(), BuildError> {
        if self.locations.contains_key(&location.location_id) {
            return Err(BuildError::DuplicateLocationId(
                location.location_id.to_string(),
            ));
        }
        self.location_order.push(location.location_id.clone());
        self.locations.insert(location.location_id.clone(), location);
        Ok(())
    }

    pub fn register_task(&mut self, task: Task) -> Result<(), BuildError> {
        if self.tasks.contains_key(&task.task_id) {
            return Err(BuildError::DuplicateTaskId(task.task_id.to_string()));
        }
        self.tasks.insert(task.task_id.clone(), task);
        Ok(())
    }

    /// Remove an entity from the table. Callers are responsible for
    /// stripping indexes first (the executor's destroy path does).
    pub fn unregister_entity(&mut self, entity_id: &EntityId) -> Option<Entity> {
        self.entity_order.retain(|e| e != entity_id);
        self.entities.remove(entity_id)
    }

    pub fn unregister_task(&mut self, task_id: &TaskId) -> Option<Task> {
        self.tasks.remove(task_id)
    }

    // --- Lookups (Option on miss, never an error) ---

    pub fn entity(&self, entity_id: &EntityId) -> Option<&Entity> {
        self.entities.get(entity_id)
    }

    pub fn entity_mut(&mut self, entity_id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(entity_id)
    }

    pub fn location(&self, location_id: &LocationId) -> Option<&Location> {
        self.locations.get(location_id)
    }

    pub fn location_mut(&mut self, location_id: &LocationId) -> Option<&mut Location> {
        self.locations.get_mut(location_id)
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn task_mut(&mut self, task_id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(task_id)
    }

    /// Entity ids in stable insertion order.
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_order
    }

    /// Location ids in stable insertion order.
    pub fn location_ids(&self) -> &[LocationId] {
        &self.location_order
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().cloned().collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    // --- Location resolution ---

    /// Resolve an entity's location: direct membership first, then walk
    /// "is contained by" edges upward. A visited set guards against
    /// malformed container cycles; a dead end yields `None`.
    pub fn location_of(&self, entity_id: &EntityId) -> Option<LocationId> {
        let mut visited: AHashSet<EntityId> = AHashSet::new();
        let mut current = entity_id.clone();

        loop {
            if current.as_str().is_empty() || !visited.insert(current.clone()) {
                return None;
            }

            for loc_id in &self.location_order {
                if self.locations[loc_id].contains(&current) {
                    return Some(loc_id.clone());
                }
            }

            match self.find_container_holding(&current) {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Find the container entity whose slots hold `item_id`.
    pub fn find_container_holding(&self, item_id: &EntityId) -> Option<EntityId> {
        for eid in &self.entity_order {
            if let Some(cc) = self.entities[eid].container() {
                if cc.has_item(item_id) {
                    return Some(eid.clone());
                }
            }
        }
        None
    }

    // --- Location index maintenance ---

    pub fn ensure_entity_in_location(&mut self, entity_id: &EntityId, location_id: &LocationId) {
        if let Some(loc) = self.locations.get_mut(location_id) {
            loc.add_entity_id(entity_id.clone());
        }
    }

    pub fn ensure_entity_removed_from_location(
        &mut self,
        entity_id: &EntityId,
        location_id: &LocationId,
    ) {
        if let Some(loc) = self.locations.get_mut(location_id) {
            loc.remove_entity_id(entity_id);
        }
    }

    /// Move a batch of ids from one location index to another. Idempotent;
    /// never leaves an id indexed twice.
    pub fn move_ids_between_locations(
        &mut self,
        ids: &[EntityId],
        from: &LocationId,
        to: &LocationId,
    ) {
        for eid in ids {
            self.ensure_entity_removed_from_location(eid, from);
            self.ensure_entity_in_location(eid, to);
        }
    }

    /// Recursively collect every id contained (directly or transitively)
    /// inside the given entity's container.
    pub fn collect_descendant_item_ids(&self, root: &EntityId) -> Vec<EntityId> {
        let mut collected = Vec::new();
        let mut visited: AHashSet<EntityId> = AHashSet::new();
        self.collect_descendants_inner(root, &mut collected, &mut visited);
        collected
    }

    fn collect_descendants_inner(
        &self,
        root: &EntityId,
        out: &mut Vec<EntityId>,
        visited: &mut AHashSet<EntityId>,
    ) {
        if !visited.insert(root.clone()) {
            return;
        }
        let Some(cc) = self.entities.get(root).and_then(|e| e.container()) else {
            return;
        };
        for child in cc.all_item_ids() {
            out.push(child.clone());
            self.collect_descendants_inner(&child, out, visited);
        }
    }

    /// True when inserting `item_id` into `container_id`'s container would
    /// close a containment cycle. Enforced at every insertion point.
    pub fn would_create_containment_cycle(
        &self,
        container_id: &EntityId,
        item_id: &EntityId,
    ) -> bool {
        if container_id == item_id {
            return true;
        }
        self.collect_descendant_item_ids(item_id)
            .iter()
            .any(|d| d == container_id)
    }

    // --- Logs ---

    /// Append an event to the world log, snapshotting the actor's location.
    pub fn record_event(&mut self, event: Event, actor_id: Option<&EntityId>) {
        let location_id = actor_id.and_then(|a| self.location_of(a));
        self.event_seq += 1;
        self.event_log.push(EventRecord {
            seq: self.event_seq,
            tick: self.game_time.total_ticks,
            location_id,
            actor_id: actor_id.cloned(),
            event,
        });
    }

    /// Record an action attempt (success or failure) with name snapshots.
    pub fn record_interaction_attempt(
        &mut self,
        actor_id: &EntityId,
        verb: &str,
        target_id: &EntityId,
        status: InteractionStatus,
        reason: &str,
        recipe_id: &str,
    ) {
        let actor_name = self
            .entities
            .get(actor_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| actor_id.to_string());
        let target_name = self
            .entities
            .get(target_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| target_id.to_string());
        let location_id = self.location_of(actor_id);

        self.interaction_seq += 1;
        self.interaction_log.push(InteractionRecord {
            seq: self.interaction_seq,
            tick: self.game_time.total_ticks,
            location_id,
            actor_id: actor_id.clone(),
            actor_name,
            verb: verb.to_string(),
            target_id: target_id.clone(),
            target_name,
            recipe_id: recipe_id.to_string(),
            status,
            reason: reason.to_string(),
        });
    }
}
