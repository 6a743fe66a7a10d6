//! World construction from a data bundle
//!
//! Locations first, then entities from templates into their declared
//! locations, then a second pass wiring `parent_container` edges, then
//! persisted task snapshots. Structural problems (missing template,
//! duplicate id, containment cycle, entity with no location) abort the
//! build; recoverable data gaps (parent without a container component,
//! missing task host) are synthesized with defaults and logged, because
//! upstream data is assumed imperfect during content authoring.

use crate::core::error::BuildError;
use crate::core::types::{EntityId, LocationId, TaskId};
use crate::model::component::{
    self, Component, ControlComponent, DecisionArbiterComponent, TagComponent,
    TaskHostComponent, UnknownComponent, WorkerComponent,
};
use crate::model::container::{ContainerComponent, Slot, SlotConfig};
use crate::model::task::TaskStatus;
use crate::model::{Entity, Location, Task, WorldState};
use crate::sim::interrupt::InterruptRule;
use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use tracing::warn;

use super::{TemplateDef, WorldDef};

/// Build a runnable world from the snapshot and template table.
pub fn build_world_state(
    world_def: &WorldDef,
    templates: &AHashMap<String, TemplateDef>,
) -> Result<WorldState, BuildError> {
    let mut world = WorldState::new();
    world.game_time.total_ticks = world_def.world_state.current_tick;

    for loc_def in &world_def.locations {
        if loc_def.location_id.trim().is_empty() {
            continue;
        }
        let mut location = Location::new(
            LocationId::new(loc_def.location_id.clone()),
            loc_def.name.clone(),
        );
        location.description = loc_def.description.clone();
        for (path, target) in &loc_def.connections {
            location
                .connections
                .insert(path.clone(), LocationId::new(target.clone()));
        }
        world.register_location(location)?;
    }

    // Placements, remembering parent_container edges for the second pass
    let mut parent_edges: Vec<(EntityId, String)> = Vec::new();

    for loc_def in &world_def.locations {
        let loc_id = LocationId::new(loc_def.location_id.clone());
        for placement in &loc_def.entities {
            if placement.template_id.is_empty() || placement.instance_id.is_empty() {
                continue;
            }
            let mut entity = create_entity_from_template(
                &placement.template_id,
                EntityId::new(placement.instance_id.clone()),
                templates,
            )?;
            apply_component_overrides(&mut entity, &placement.component_overrides);

            let entity_id = entity.entity_id.clone();
            world.register_entity(entity)?;
            world.ensure_entity_in_location(&entity_id, &loc_id);

            if !placement.parent_container.trim().is_empty() {
                parent_edges.push((entity_id, placement.parent_container.trim().to_string()));
            }
        }
    }

    for (child_id, parent_ref) in &parent_edges {
        wire_parent_container(&mut world, child_id, parent_ref)?;
    }

    for snapshot in &world_def.tasks {
        restore_task_snapshot(&mut world, snapshot);
    }

    for eid in world.entity_ids().to_vec() {
        if let Some(entity) = world.entity_mut(&eid) {
            entity.ensure_initialized();
        }
    }

    validate_world(&world)?;
    Ok(world)
}

/// Instantiate an entity from its template. Also used by the executor's
/// runtime `CreateEntity` path.
pub fn create_entity_from_template(
    template_id: &str,
    instance_id: EntityId,
    templates: &AHashMap<String, TemplateDef>,
) -> Result<Entity, BuildError> {
    let template = templates
        .get(template_id)
        .ok_or_else(|| BuildError::TemplateNotFound(template_id.to_string()))?;

    let name = if template.name.is_empty() {
        "Unnamed Entity".to_string()
    } else {
        template.name.clone()
    };
    let mut entity = Entity::new(instance_id, template_id, name);

    for (comp_name, comp_data) in &template.components {
        let (key, comp) = build_component(comp_name, comp_data);
        entity.add_component(key, comp)?;
    }

    // Agents always carry action rights, even when the data predates the
    // worker component.
    if entity.has_tag("agent") && !entity.has_component(component::WORKER) {
        entity.add_component(component::WORKER, Component::Worker(WorkerComponent::default()))?;
    }

    Ok(entity)
}

/// Map one authored component payload to its typed variant. Unrecognized
/// names land as `Unknown` under their authored key; legacy names are
/// normalized to the canonical key.
fn build_component(component_name: &str, data: &Value) -> (String, Component) {
    let parse_control = |default_provider: &str| -> ControlComponent {
        let mut ctrl: ControlComponent =
            serde_json::from_value(data.clone()).unwrap_or_default();
        if ctrl.provider_id.is_empty() {
            ctrl.provider_id = default_provider.to_string();
        }
        ctrl
    };

    match component_name {
        component::TAG => {
            let tags: TagComponent = serde_json::from_value(data.clone()).unwrap_or_default();
            (component::TAG.to_string(), Component::Tag(tags))
        }
        component::CREATURE => {
            let creature = serde_json::from_value(data.clone()).unwrap_or_default();
            (component::CREATURE.to_string(), Component::Creature(creature))
        }
        component::AGENT => {
            let agent = serde_json::from_value(data.clone()).unwrap_or_default();
            (component::AGENT.to_string(), Component::Agent(agent))
        }
        // Legacy data may still name the agent controller after its LLM
        // incarnation.
        component::AGENT_CONTROL | "LLMControlComponent" => (
            component::AGENT_CONTROL.to_string(),
            Component::AgentControl(parse_control("")),
        ),
        component::PLAYER_CONTROL => (
            component::PLAYER_CONTROL.to_string(),
            Component::PlayerControl(parse_control("player")),
        ),
        component::LOGIC_CONTROL => (
            component::LOGIC_CONTROL.to_string(),
            Component::LogicControl(parse_control("logic")),
        ),
        component::CONTAINER => {
            let mut slots = Vec::new();
            if let Some(slot_map) = data.get("slots").and_then(Value::as_object) {
                for (slot_id, slot_cfg) in slot_map {
                    let config: SlotConfig =
                        serde_json::from_value(slot_cfg.clone()).unwrap_or_default();
                    slots.push(Slot::new(slot_id.clone(), config));
                }
            }
            (
                component::CONTAINER.to_string(),
                Component::Container(ContainerComponent { slots }),
            )
        }
        component::DECISION_ARBITER => {
            let rules = data
                .get("rules")
                .and_then(Value::as_array)
                .map(|raw| raw.iter().filter_map(InterruptRule::from_value).collect())
                .unwrap_or_default();
            (
                component::DECISION_ARBITER.to_string(),
                Component::DecisionArbiter(DecisionArbiterComponent::new(rules)),
            )
        }
        // Legacy name "TaskComponent" predates the host/worker split.
        component::TASK_HOST | "TaskComponent" => (
            component::TASK_HOST.to_string(),
            Component::TaskHost(TaskHostComponent::default()),
        ),
        component::WORKER => {
            let worker = serde_json::from_value(data.clone()).unwrap_or_default();
            (component::WORKER.to_string(), Component::Worker(worker))
        }
        other => {
            let raw = match data.as_object() {
                Some(map) => map.clone(),
                None => {
                    let mut map = serde_json::Map::new();
                    map.insert("value".to_string(), data.clone());
                    map
                }
            };
            (
                other.to_string(),
                Component::Unknown(UnknownComponent::new(raw)),
            )
        }
    }
}

/// Apply per-placement component overrides on top of the template.
pub fn apply_component_overrides(
    entity: &mut Entity,
    overrides: &serde_json::Map<String, Value>,
) {
    for (comp_name, patch) in overrides {
        let Some(patch_map) = patch.as_object() else {
            continue;
        };
        // Legacy names route to the canonical keys used at build.
        let key = match comp_name.as_str() {
            "LLMControlComponent" => component::AGENT_CONTROL,
            "TaskComponent" => component::TASK_HOST,
            other => other,
        };
        let Some(comp) = entity.component_mut(key) else {
            continue;
        };

        match comp {
            Component::Unknown(u) => {
                for (k, v) in patch_map {
                    u.data.insert(k.clone(), v.clone());
                }
            }
            Component::Container(cc) => {
                apply_container_override(cc, patch_map);
            }
            Component::Worker(w) => {
                if let Some(tid) = patch_map.get("current_task_id").and_then(Value::as_str) {
                    if tid.is_empty() {
                        w.stop_task();
                    } else {
                        w.assign_task(TaskId::new(tid));
                    }
                }
            }
            Component::Tag(t) => {
                if let Some(tags) = patch_map.get("tags").and_then(Value::as_array) {
                    t.tags = tags
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                }
            }
            Component::Creature(c) => {
                for (prop, v) in patch_map {
                    if let Some(n) = v.as_f64() {
                        match prop.as_str() {
                            "max_hp" => c.max_hp = n as f32,
                            "max_energy" => c.max_energy = n as f32,
                            "max_nutrition" => c.max_nutrition = n as f32,
                            "current_hp" => c.current_hp = Some(n as f32),
                            "current_energy" => c.current_energy = Some(n as f32),
                            "current_nutrition" => c.current_nutrition = Some(n as f32),
                            _ => {}
                        }
                    }
                }
            }
            Component::AgentControl(ctrl)
            | Component::PlayerControl(ctrl)
            | Component::LogicControl(ctrl) => {
                if let Some(enabled) = patch_map.get("enabled").and_then(Value::as_bool) {
                    ctrl.enabled = enabled;
                }
                if let Some(pid) = patch_map.get("provider_id").and_then(Value::as_str) {
                    ctrl.provider_id = pid.to_string();
                }
            }
            _ => {
                tracing::debug!(entity_id = %entity.entity_id, component = key,
                    "override on component kind without override support");
            }
        }
    }
}

fn apply_container_override(cc: &mut ContainerComponent, patch: &serde_json::Map<String, Value>) {
    let Some(slots_patch) = patch.get("slots").and_then(Value::as_object) else {
        return;
    };
    for (slot_id, slot_patch) in slots_patch {
        let Some(sp) = slot_patch.as_object() else {
            continue;
        };
        if cc.slot(slot_id).is_none() {
            cc.slots.push(Slot::new(slot_id.clone(), SlotConfig::default()));
        }
        let Some(slot) = cc.slot_mut(slot_id) else {
            continue;
        };
        if let Some(cfg) = sp.get("config") {
            if let Ok(config) = serde_json::from_value::<SlotConfig>(cfg.clone()) {
                slot.config = config;
            }
        }
        if let Some(items) = sp.get("items").and_then(Value::as_array) {
            slot.items = items
                .iter()
                .filter_map(Value::as_str)
                .map(EntityId::new)
                .collect();
        }
    }
}

/// Second pass: attach a declared child to its parent container (or move
/// it into a parent location). Runs after every entity exists so forward
/// references resolve.
fn wire_parent_container(
    world: &mut WorldState,
    child_id: &EntityId,
    parent_ref: &str,
) -> Result<(), BuildError> {
    let parent_loc = LocationId::new(parent_ref);
    if world.location(&parent_loc).is_some() {
        move_entity_to_location(world, child_id, &parent_loc);
        return Ok(());
    }

    let parent_id = EntityId::new(parent_ref);
    if world.entity(&parent_id).is_none() {
        warn!(child = %child_id, parent = parent_ref,
            "parent_container resolves to neither an entity nor a location");
        return Ok(());
    }

    if world.would_create_containment_cycle(&parent_id, child_id) {
        return Err(BuildError::ContainerCycle(child_id.to_string()));
    }

    let child_tags = world
        .entity(child_id)
        .map(|e| e.all_tags())
        .unwrap_or_default();

    let parent = world
        .entity_mut(&parent_id)
        .ok_or_else(|| BuildError::OrphanedEntity(child_id.to_string()))?;
    if parent.container().is_none() {
        // Data may reference a parent before authoring its container.
        warn!(parent = %parent_id, "synthesizing default container component");
        parent.add_component(
            component::CONTAINER,
            Component::Container(ContainerComponent::with_default_slot()),
        )?;
    }
    if let Some(cc) = parent.container_mut() {
        if !cc.add_item(child_id, &child_tags, None) {
            warn!(child = %child_id, parent = %parent_id,
                "container rejected declared child (capacity or tag filter)");
        }
    }

    // Containment decides the location: the child belongs wherever the
    // parent is.
    if let Some(parent_loc) = world.location_of(&parent_id) {
        move_entity_to_location(world, child_id, &parent_loc);
    }
    Ok(())
}

fn move_entity_to_location(world: &mut WorldState, entity_id: &EntityId, to: &LocationId) {
    for loc_id in world.location_ids().to_vec() {
        if &loc_id != to {
            world.ensure_entity_removed_from_location(entity_id, &loc_id);
        }
    }
    world.ensure_entity_in_location(entity_id, to);
}

/// Restore one persisted task. Snapshot problems are tolerated with a
/// warning so one stale task cannot block the whole world.
fn restore_task_snapshot(world: &mut WorldState, snapshot: &super::TaskSnapshot) {
    if snapshot.target_entity_id.is_empty() {
        return;
    }
    let target_id = EntityId::new(snapshot.target_entity_id.clone());
    if world.entity(&target_id).is_none() {
        warn!(target = %target_id, "task snapshot targets a missing entity");
        return;
    }

    let agent_id = (!snapshot.current_agent_id.is_empty())
        .then(|| EntityId::new(snapshot.current_agent_id.clone()))
        .filter(|aid| world.entity(aid).is_some());
    let host_id = agent_id.clone().unwrap_or_else(|| target_id.clone());

    let mut task = Task::new(snapshot.task_type.clone(), target_id);
    if !snapshot.task_id.is_empty() {
        task.task_id = TaskId::new(snapshot.task_id.clone());
    }
    task.progress = snapshot.progress;
    task.required_progress = snapshot.required_progress.unwrap_or(1.0);
    task.multiple_entity = snapshot.multiple_entity;
    if let Some(status) = TaskStatus::parse(&snapshot.task_status) {
        task.status = status;
    }
    task.assigned_agent_ids = snapshot
        .assigned_agent_ids
        .iter()
        .map(EntityId::new)
        .collect();
    task.parameters = snapshot.parameters.clone();
    task.completion_effects = snapshot
        .completion_effects
        .iter()
        .filter(|v| v.is_object())
        .cloned()
        .collect();
    task.progressor_id = snapshot.progressor_id.clone();
    task.progressor_params = snapshot.progressor_params.clone();
    task.tick_effects = snapshot
        .tick_effects
        .iter()
        .filter(|v| v.is_object())
        .cloned()
        .collect();

    let task_id = task.task_id.clone();

    let Some(host_entity) = world.entity_mut(&host_id) else {
        return;
    };
    if host_entity.task_host().is_none() {
        warn!(host = %host_id, "synthesizing task host component for restored task");
        if host_entity
            .add_component(
                component::TASK_HOST,
                Component::TaskHost(TaskHostComponent::default()),
            )
            .is_err()
        {
            return;
        }
    }
    if let Some(host) = host_entity.task_host_mut() {
        if host.add_task(task_id.clone()).is_err() {
            warn!(task = %task_id, host = %host_id, "duplicate task id on host, skipping");
            return;
        }
    }
    if let Err(err) = world.register_task(task) {
        warn!(%err, "task snapshot rejected by the world index");
        if let Some(host) = world
            .entity_mut(&host_id)
            .and_then(|e| e.task_host_mut())
        {
            host.remove_task(&task_id);
        }
        return;
    }

    if let Some(aid) = agent_id {
        if let Some(worker) = world.entity_mut(&aid).and_then(|e| e.worker_mut()) {
            worker.assign_task(task_id);
        }
    }
}

/// Post-build validation: the container graph must be acyclic and every
/// entity must resolve to a location. Fails fast instead of letting the
/// runtime cycle guard silently mask malformed data.
fn validate_world(world: &WorldState) -> Result<(), BuildError> {
    for eid in world.entity_ids() {
        let mut visited: AHashSet<EntityId> = AHashSet::new();
        visited.insert(eid.clone());
        let mut current = eid.clone();
        while let Some(parent) = world.find_container_holding(&current) {
            if !visited.insert(parent.clone()) {
                return Err(BuildError::ContainerCycle(eid.to_string()));
            }
            current = parent;
        }

        if world.location_of(eid).is_none() {
            return Err(BuildError::OrphanedEntity(eid.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn templates() -> AHashMap<String, TemplateDef> {
        let mut t = AHashMap::new();
        t.insert(
            "apple".to_string(),
            serde_json::from_value(json!({
                "name": "Apple",
                "components": {
                    "TagComponent": {"tags": ["item", "edible"]},
                }
            }))
            .unwrap(),
        );
        t.insert(
            "chest".to_string(),
            serde_json::from_value(json!({
                "name": "Chest",
                "components": {
                    "TagComponent": {"tags": ["container"]},
                    "ContainerComponent": {"slots": {"main": {"transparent": false}}},
                }
            }))
            .unwrap(),
        );
        t.insert(
            "beatrice".to_string(),
            serde_json::from_value(json!({
                "name": "Beatrice",
                "components": {
                    "TagComponent": {"tags": ["agent"]},
                    "CreatureComponent": {"max_nutrition": 100.0},
                    "LLMControlComponent": {"enabled": true},
                    "DecisionArbiterComponent": {"rules": [
                        {"rule": "LowNutrition", "priority": 10, "threshold": 50},
                        {"rule": "Idle", "priority": 999},
                    ]},
                }
            }))
            .unwrap(),
        );
        t
    }

    fn world_def(extra_placements: Vec<Value>) -> WorldDef {
        let mut entities = vec![
            json!({"template_id": "beatrice", "instance_id": "beatrice_01"}),
            json!({"template_id": "chest", "instance_id": "chest_01"}),
        ];
        entities.extend(extra_placements);
        serde_json::from_value(json!({
            "world_state": {"current_tick": 5},
            "locations": [{
                "location_id": "bedroom",
                "location_name": "Bedroom",
                "entities": entities,
            }],
        }))
        .unwrap()
    }

    #[test]
    fn test_build_places_entities_and_sets_clock() {
        let world = build_world_state(&world_def(vec![]), &templates()).unwrap();
        assert_eq!(world.current_tick(), 5);
        assert!(world
            .location(&LocationId::new("bedroom"))
            .unwrap()
            .contains(&EntityId::new("beatrice_01")));
    }

    #[test]
    fn test_agent_gets_worker_and_normalized_control_key() {
        let world = build_world_state(&world_def(vec![]), &templates()).unwrap();
        let agent = world.entity(&EntityId::new("beatrice_01")).unwrap();
        assert!(agent.worker().is_some());
        assert!(agent.has_component(component::AGENT_CONTROL));
        assert!(!agent.has_component("LLMControlComponent"));
        // creature currents initialized from maxima
        assert_eq!(agent.creature().unwrap().current_nutrition, Some(100.0));
    }

    #[test]
    fn test_parent_container_wires_and_double_indexes() {
        let def = world_def(vec![json!({
            "template_id": "apple",
            "instance_id": "apple_01",
            "parent_container": "chest_01",
        })]);
        let world = build_world_state(&def, &templates()).unwrap();

        let chest = world.entity(&EntityId::new("chest_01")).unwrap();
        assert!(chest.container().unwrap().has_item(&EntityId::new("apple_01")));
        // containment and location index are orthogonal: the item stays
        // findable through both
        assert!(world
            .location(&LocationId::new("bedroom"))
            .unwrap()
            .contains(&EntityId::new("apple_01")));
    }

    #[test]
    fn test_parent_without_container_is_synthesized() {
        let def = world_def(vec![json!({
            "template_id": "apple",
            "instance_id": "apple_01",
            "parent_container": "beatrice_01",
        })]);
        let world = build_world_state(&def, &templates()).unwrap();
        let agent = world.entity(&EntityId::new("beatrice_01")).unwrap();
        assert!(agent.container().unwrap().has_item(&EntityId::new("apple_01")));
    }

    #[test]
    fn test_missing_template_fails_fast() {
        let def = world_def(vec![json!({
            "template_id": "dragon",
            "instance_id": "dragon_01",
        })]);
        assert!(matches!(
            build_world_state(&def, &templates()),
            Err(BuildError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_instance_id_fails_fast() {
        let def = world_def(vec![json!({
            "template_id": "apple",
            "instance_id": "chest_01",
        })]);
        assert!(matches!(
            build_world_state(&def, &templates()),
            Err(BuildError::DuplicateEntityId(_))
        ));
    }

    #[test]
    fn test_container_cycle_rejected_at_build() {
        // chest_02 inside chest_01, chest_01 inside chest_02
        let def = world_def(vec![
            json!({"template_id": "chest", "instance_id": "chest_02",
                   "parent_container": "chest_01"}),
        ]);
        // sneak the back edge in through an override on chest_02
        let mut def = def;
        def.locations[0].entities[2].component_overrides = serde_json::from_value(json!({
            "ContainerComponent": {"slots": {"main": {"items": ["chest_01"]}}}
        }))
        .unwrap();
        assert!(matches!(
            build_world_state(&def, &templates()),
            Err(BuildError::ContainerCycle(_))
        ));
    }

    #[test]
    fn test_task_snapshot_restored_and_assigned() {
        let mut def = world_def(vec![]);
        def.tasks = vec![serde_json::from_value(json!({
            "task_id": "task_sleep_1",
            "verb": "Sleep",
            "target_entity_id": "beatrice_01",
            "progress": 10.0,
            "required_progress": 60.0,
            "task_status": "InProgress",
            "current_agent_id": "beatrice_01",
            "progressor_id": "Linear",
        }))
        .unwrap()];

        let world = build_world_state(&def, &templates()).unwrap();
        let task = world.task(&TaskId::new("task_sleep_1")).unwrap();
        assert_eq!(task.progress, 10.0);
        assert_eq!(task.status, TaskStatus::InProgress);

        let agent = world.entity(&EntityId::new("beatrice_01")).unwrap();
        assert_eq!(
            agent.worker().unwrap().current_task_id,
            Some(TaskId::new("task_sleep_1"))
        );
        assert!(agent.task_host().unwrap().has_task(&TaskId::new("task_sleep_1")));
    }
}
