//! The effect executor: single mutation gateway for the world
//!
//! `execute` interprets one declarative effect against the world and
//! returns the events it produced. Every effect is total over its failure
//! domain: unresolved targets, unknown opcodes and rejected placements
//! come back as `Event::ExecutorError`, never as `Err` or a panic, so a
//! single bad effect cannot abort a tick. Callers decide whether to halt
//! an actor's action loop on error.

use crate::core::types::{EntityId, LocationId, TaskId};
use crate::data::builder::create_entity_from_template;
use crate::data::TemplateDef;
use crate::effect::{Destination, DestinationKind, Effect};
use crate::event::Event;
use crate::interaction::Recipe;
use crate::model::component::{self, Component, TaskHostComponent};
use crate::model::task::TaskStatus;
use crate::model::{Task, WorldState};
use ahash::AHashMap;
use serde_json::Value;

/// String-addressed bindings an effect resolves against.
///
/// Effects name their subjects by context key ("agent", "target",
/// "entity_to_destroy") rather than by id, so one recipe works for any
/// actor/target pair.
#[derive(Debug, Clone, Default)]
pub struct EffectContext {
    ids: AHashMap<String, EntityId>,
    /// Ids destroyed by `ConsumeInputs`
    pub consumption_ids: Vec<EntityId>,
    /// Matched recipe, required by `CreateTask`
    pub recipe: Option<Recipe>,
    /// Running task, the fallback subject for task effects
    pub task_id: Option<TaskId>,
    /// Written back by `CreateTask`
    pub created_task_id: Option<TaskId>,
}

impl EffectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_actor(actor_id: &EntityId) -> Self {
        Self::new().with_id("agent", actor_id.clone())
    }

    pub fn with_id(mut self, key: impl Into<String>, id: EntityId) -> Self {
        self.ids.insert(key.into(), id);
        self
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn set_id(&mut self, key: impl Into<String>, id: EntityId) {
        self.ids.insert(key.into(), id);
    }

    pub fn id(&self, key: &str) -> Option<&EntityId> {
        self.ids.get(key)
    }

    pub fn actor_id(&self) -> Option<&EntityId> {
        self.ids.get("agent")
    }
}

/// Source or destination of a transfer
enum PlaceRef {
    Container(EntityId),
    Location(LocationId),
}

fn error(message: impl Into<String>) -> Vec<Event> {
    vec![Event::ExecutorError {
        message: message.into(),
    }]
}

/// The only path through which world state may change.
///
/// Holds the template table so `CreateEntity` can instantiate at runtime;
/// everything else it needs arrives per call.
#[derive(Default)]
pub struct WorldExecutor {
    templates: AHashMap<String, TemplateDef>,
}

impl WorldExecutor {
    pub fn new(templates: AHashMap<String, TemplateDef>) -> Self {
        Self { templates }
    }

    pub fn execute(
        &self,
        world: &mut WorldState,
        effect: &Effect,
        ctx: &mut EffectContext,
    ) -> Vec<Event> {
        match effect {
            Effect::ModifyProperty {
                target,
                component,
                property,
                change,
            } => self.modify_property(world, ctx, target, component, property, *change),
            Effect::CreateEntity {
                template,
                destination,
                instance_id,
            } => self.create_entity(world, ctx, template, destination.as_ref(), instance_id.as_deref()),
            Effect::DestroyEntity { target } => self.destroy_entity(world, ctx, target),
            Effect::TransferEntity => self.transfer_entity(world, ctx),
            Effect::AddCondition {
                target,
                condition_id,
            } => self.mutate_conditions(world, ctx, target, condition_id, true),
            Effect::RemoveCondition {
                target,
                condition_id,
            } => self.mutate_conditions(world, ctx, target, condition_id, false),
            Effect::ConsumeInputs => self.consume_inputs(world, ctx),
            Effect::CreateTask => self.create_task(world, ctx),
            Effect::ProgressTask { task_id, delta } => {
                self.progress_task(world, ctx, task_id.as_ref(), *delta)
            }
            Effect::UpdateTaskStatus { task_id, status } => {
                self.update_task_status(world, ctx, task_id.as_ref(), status)
            }
            Effect::FinishTask => self.finish_task(world, ctx),
            Effect::Unknown(raw) => {
                let tag = raw
                    .get("effect")
                    .and_then(Value::as_str)
                    .unwrap_or("<missing>");
                error(format!("unknown effect type: {tag}"))
            }
        }
    }

    fn resolve_ctx_entity<'w>(
        &self,
        world: &'w WorldState,
        ctx: &EffectContext,
        key: &str,
    ) -> Option<&'w crate::model::Entity> {
        ctx.id(key).and_then(|eid| world.entity(eid))
    }

    // --- ModifyProperty ---

    fn modify_property(
        &self,
        world: &mut WorldState,
        ctx: &EffectContext,
        target_key: &str,
        comp_name: &str,
        prop_name: &str,
        change: f32,
    ) -> Vec<Event> {
        let Some(target_id) = ctx.id(target_key).cloned() else {
            return error("ModifyProperty: target missing");
        };
        let Some(target) = world.entity_mut(&target_id) else {
            return error("ModifyProperty: target missing");
        };
        let Some(comp) = target.component_mut(comp_name) else {
            return error(format!("ModifyProperty: component missing: {comp_name}"));
        };

        let new_value = match comp {
            Component::Creature(c) => c.add_to_property(prop_name, change),
            Component::Unknown(u) => {
                let current = u.data.get(prop_name).and_then(Value::as_f64).unwrap_or(0.0);
                let updated = current + change as f64;
                u.data.insert(prop_name.to_string(), Value::from(updated));
                Some(updated as f32)
            }
            _ => {
                return error("ModifyProperty: unsupported component type");
            }
        };

        match new_value {
            Some(value) => vec![Event::PropertyModified {
                entity_id: target_id,
                component: comp_name.to_string(),
                property: prop_name.to_string(),
                delta: change,
                new_value: value,
            }],
            None => error(format!("ModifyProperty: property missing: {prop_name}")),
        }
    }

    // --- CreateEntity ---

    fn create_entity(
        &self,
        world: &mut WorldState,
        ctx: &EffectContext,
        template_id: &str,
        destination: Option<&Destination>,
        instance_id: Option<&str>,
    ) -> Vec<Event> {
        if template_id.is_empty() || destination.is_none() {
            return error("CreateEntity: missing template or destination");
        }

        let new_id = match instance_id {
            Some(id) if !id.is_empty() => EntityId::new(id),
            _ => EntityId::fresh(template_id),
        };
        let entity = match create_entity_from_template(template_id, new_id, &self.templates) {
            Ok(e) => e,
            Err(err) => return error(format!("CreateEntity: {err}")),
        };
        let entity_id = entity.entity_id.clone();
        let entity_tags = entity.all_tags();
        if let Err(err) = world.register_entity(entity) {
            return error(format!("CreateEntity: {err}"));
        }

        let mut placed = false;
        if let Some(Destination {
            kind: DestinationKind::Container,
            target,
        }) = destination
        {
            if let Some(parent_id) = ctx.id(target).cloned() {
                if !world.would_create_containment_cycle(&parent_id, &entity_id) {
                    if let Some(cc) = world.entity_mut(&parent_id).and_then(|e| e.container_mut())
                    {
                        if cc.add_item(&entity_id, &entity_tags, None) {
                            // Contained entities stay findable through the
                            // spatial index too.
                            if let Some(loc) = world.location_of(&parent_id) {
                                world.ensure_entity_in_location(&entity_id, &loc);
                            }
                            placed = true;
                        }
                    }
                }
            }
        }

        // Location destinations, and any failed container placement, land
        // at the actor's feet.
        if !placed {
            let actor_loc = ctx
                .actor_id()
                .and_then(|agent| world.location_of(agent));
            if let Some(loc) = actor_loc {
                world.ensure_entity_in_location(&entity_id, &loc);
                placed = true;
            }
        }

        vec![Event::EntityCreated {
            entity_id,
            template_id: template_id.to_string(),
            placed,
        }]
    }

    // --- DestroyEntity ---

    fn destroy_entity(
        &self,
        world: &mut WorldState,
        ctx: &EffectContext,
        target_key: &str,
    ) -> Vec<Event> {
        let Some(target_id) = ctx.id(target_key).cloned() else {
            return error("DestroyEntity: target missing");
        };
        if world.entity(&target_id).is_none() {
            return error("DestroyEntity: target missing");
        }
        let mut events = Vec::new();
        self.destroy_cascade(world, &target_id, &mut events);
        events
    }

    /// Contents first, then the entity itself, stripping every location
    /// and container index so no dangling id survives.
    fn destroy_cascade(&self, world: &mut WorldState, entity_id: &EntityId, events: &mut Vec<Event>) {
        let children = world
            .entity(entity_id)
            .and_then(|e| e.container())
            .map(|cc| cc.all_item_ids())
            .unwrap_or_default();
        for child in children {
            if world.entity(&child).is_some() {
                self.destroy_cascade(world, &child, events);
            }
        }

        for loc_id in world.location_ids().to_vec() {
            world.ensure_entity_removed_from_location(entity_id, &loc_id);
        }
        for holder in world.entity_ids().to_vec() {
            if let Some(cc) = world.entity_mut(&holder).and_then(|e| e.container_mut()) {
                cc.remove_item(entity_id);
            }
        }
        world.unregister_entity(entity_id);
        events.push(Event::EntityDestroyed {
            entity_id: entity_id.clone(),
        });
    }

    // --- TransferEntity ---

    fn resolve_place(&self, world: &WorldState, id: &EntityId) -> Option<PlaceRef> {
        if world
            .entity(id)
            .map(|e| e.container().is_some())
            .unwrap_or(false)
        {
            return Some(PlaceRef::Container(id.clone()));
        }
        let loc_id = LocationId::new(id.as_str());
        world.location(&loc_id).map(|_| PlaceRef::Location(loc_id))
    }

    fn place_location(&self, world: &WorldState, place: &PlaceRef) -> Option<LocationId> {
        match place {
            PlaceRef::Location(loc) => Some(loc.clone()),
            PlaceRef::Container(eid) => world.location_of(eid),
        }
    }

    fn transfer_entity(&self, world: &mut WorldState, ctx: &EffectContext) -> Vec<Event> {
        let (Some(entity_id), Some(source_id), Some(dest_id)) =
            (ctx.id("entity").cloned(), ctx.id("source").cloned(), ctx.id("destination").cloned())
        else {
            return error("TransferEntity: missing entity/source/destination");
        };
        if world.entity(&entity_id).is_none() {
            return error("TransferEntity: missing entity/source/destination");
        }
        let (Some(source), Some(dest)) = (
            self.resolve_place(world, &source_id),
            self.resolve_place(world, &dest_id),
        ) else {
            return error("TransferEntity: missing entity/source/destination");
        };

        // Cycle prevention is an insertion-time invariant: a container may
        // never enter itself or one of its descendants.
        if let PlaceRef::Container(dest_container) = &dest {
            if world.would_create_containment_cycle(dest_container, &entity_id) {
                return error("TransferEntity: transfer would create a containment cycle");
            }
        }

        let source_loc = self.place_location(world, &source);
        let dest_loc = self.place_location(world, &dest);
        let cross_location = match (&source_loc, &dest_loc) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        };

        match &source {
            PlaceRef::Location(loc_id) => {
                if cross_location {
                    world.ensure_entity_removed_from_location(&entity_id, loc_id);
                }
            }
            PlaceRef::Container(holder) => {
                let removed = world
                    .entity_mut(holder)
                    .and_then(|e| e.container_mut())
                    .map(|cc| cc.remove_item(&entity_id))
                    .unwrap_or(false);
                if !removed {
                    return error("TransferEntity: failed to remove from source container");
                }
            }
        }

        let entity_tags = world
            .entity(&entity_id)
            .map(|e| e.all_tags())
            .unwrap_or_default();
        let added = match &dest {
            PlaceRef::Location(loc_id) => world
                .location_mut(loc_id)
                .map(|loc| {
                    loc.add_entity_id(entity_id.clone());
                    true
                })
                .unwrap_or(false),
            PlaceRef::Container(holder) => {
                let ok = world
                    .entity_mut(holder)
                    .and_then(|e| e.container_mut())
                    .map(|cc| cc.add_item(&entity_id, &entity_tags, None))
                    .unwrap_or(false);
                if ok {
                    if let Some(loc) = dest_loc.clone() {
                        world.ensure_entity_in_location(&entity_id, &loc);
                    }
                }
                ok
            }
        };
        if !added {
            return error("TransferEntity: failed to add to destination");
        }

        // A container crossing locations brings its whole subtree with it.
        if cross_location {
            if let (Some(from), Some(to)) = (source_loc, dest_loc) {
                let mut ids = vec![entity_id.clone()];
                ids.extend(world.collect_descendant_item_ids(&entity_id));
                world.move_ids_between_locations(&ids, &from, &to);
            }
        }

        vec![Event::EntityTransferred { entity_id }]
    }

    // --- Conditions ---

    /// Conditions live as a string list inside the opaque
    /// `ConditionComponent` payload; both mutations are idempotent.
    fn mutate_conditions(
        &self,
        world: &mut WorldState,
        ctx: &EffectContext,
        target_key: &str,
        condition_id: &str,
        add: bool,
    ) -> Vec<Event> {
        let op = if add { "AddCondition" } else { "RemoveCondition" };
        if condition_id.is_empty() {
            return error(format!("{op}: missing target or condition_id"));
        }
        let Some(target_id) = ctx.id(target_key).cloned() else {
            return error(format!("{op}: missing target or condition_id"));
        };
        let Some(target) = world.entity_mut(&target_id) else {
            return error(format!("{op}: missing target or condition_id"));
        };
        let Some(Component::Unknown(comp)) = target.component_mut("ConditionComponent") else {
            return error(format!("{op}: ConditionComponent missing"));
        };

        let list = comp
            .data
            .entry("conditions".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Some(conditions) = list.as_array_mut() else {
            return error(format!("{op}: conditions list malformed"));
        };

        let value = Value::String(condition_id.to_string());
        if add {
            if !conditions.contains(&value) {
                conditions.push(value);
            }
            vec![Event::ConditionAdded {
                entity_id: target_id,
                condition_id: condition_id.to_string(),
            }]
        } else {
            conditions.retain(|c| c != &value);
            vec![Event::ConditionRemoved {
                entity_id: target_id,
                condition_id: condition_id.to_string(),
            }]
        }
    }

    // --- ConsumeInputs ---

    fn consume_inputs(&self, world: &mut WorldState, ctx: &EffectContext) -> Vec<Event> {
        let mut events = Vec::new();
        for eid in ctx.consumption_ids.clone() {
            if world.entity(&eid).is_some() {
                self.destroy_cascade(world, &eid, &mut events);
            } else {
                events.extend(error(format!("ConsumeInputs: entity missing: {eid}")));
            }
        }
        events
    }

    // --- Task effects ---

    fn create_task(&self, world: &mut WorldState, ctx: &mut EffectContext) -> Vec<Event> {
        let Some(target) = self.resolve_ctx_entity(world, ctx, "target") else {
            return error("CreateTask: target missing");
        };
        let target_id = target.entity_id.clone();
        let Some(recipe) = ctx.recipe.clone() else {
            return error("CreateTask: recipe missing in context");
        };

        let agent_id = ctx
            .actor_id()
            .filter(|aid| world.entity(aid).is_some())
            .cloned();
        let host_id = agent_id.clone().unwrap_or_else(|| target_id.clone());

        let mut task = Task::new(recipe.verb.clone(), target_id.clone());
        // 1.0 only substitutes for an undeclared requirement; an authored
        // 0.0 stays and completes on the first progress check
        task.required_progress = recipe.process.required_progress.unwrap_or(1.0);
        task.completion_effects = recipe.output_effects();
        if let Some(progression) = recipe.progression_config() {
            task.progressor_id = progression.progressor.clone();
            task.progressor_params = progression.params.clone();
            task.tick_effects = progression
                .tick_effects
                .iter()
                .filter(|v| v.is_object())
                .cloned()
                .collect();
        }
        let task_id = task.task_id.clone();

        {
            let Some(host_entity) = world.entity_mut(&host_id) else {
                return error("CreateTask: host missing");
            };
            if host_entity.task_host().is_none() {
                tracing::warn!(host = %host_id, "synthesizing task host component");
                if host_entity
                    .add_component(
                        component::TASK_HOST,
                        Component::TaskHost(TaskHostComponent::default()),
                    )
                    .is_err()
                {
                    return error("CreateTask: failed to add task host component");
                }
            }
            let Some(host) = host_entity.task_host_mut() else {
                return error("CreateTask: failed to add task host component");
            };
            if host.add_task(task_id.clone()).is_err() {
                return error(format!("CreateTask: duplicate task id on host: {task_id}"));
            }
        }

        let mut events = Vec::new();
        let assigned = agent_id.clone();
        if let Some(aid) = &assigned {
            if world
                .entity(aid)
                .and_then(|e| e.worker())
                .is_some()
            {
                task.status = TaskStatus::InProgress;
                if !task.assigned_agent_ids.contains(aid) {
                    task.assigned_agent_ids.push(aid.clone());
                }
            }
        }

        if let Err(err) = world.register_task(task) {
            if let Some(host) = world.entity_mut(&host_id).and_then(|e| e.task_host_mut()) {
                host.remove_task(&task_id);
            }
            return error(format!("CreateTask: {err}"));
        }
        ctx.created_task_id = Some(task_id.clone());
        events.push(Event::TaskCreated {
            task_id: task_id.clone(),
            target_entity_id: target_id,
        });

        // The acting agent's worker takes the task immediately: action
        // rights transfer to the task system.
        if let Some(aid) = assigned {
            if let Some(worker) = world.entity_mut(&aid).and_then(|e| e.worker_mut()) {
                worker.assign_task(task_id.clone());
                events.push(Event::TaskAssigned {
                    task_id,
                    agent_id: aid,
                });
            }
        }

        events
    }

    fn progress_task(
        &self,
        world: &mut WorldState,
        ctx: &EffectContext,
        task_id: Option<&TaskId>,
        delta: f32,
    ) -> Vec<Event> {
        let Some(task_id) = task_id.or(ctx.task_id.as_ref()).cloned() else {
            return error("ProgressTask: task not found");
        };
        let Some(task) = world.task_mut(&task_id) else {
            return error(format!("ProgressTask: task not found {task_id}"));
        };
        task.progress += delta;
        vec![Event::TaskProgressed {
            task_id,
            delta,
            new_progress: task.progress,
            required: task.required_progress,
        }]
    }

    fn update_task_status(
        &self,
        world: &mut WorldState,
        ctx: &EffectContext,
        task_id: Option<&TaskId>,
        status: &str,
    ) -> Vec<Event> {
        let Some(task_id) = task_id.or(ctx.task_id.as_ref()).cloned() else {
            return error("UpdateTaskStatus: task not found");
        };
        let Some(new_status) = TaskStatus::parse(status.trim()) else {
            return error(format!("UpdateTaskStatus: invalid status: {status}"));
        };
        let Some(task) = world.task_mut(&task_id) else {
            return error(format!("UpdateTaskStatus: task not found {task_id}"));
        };
        let old_status = task.status;
        task.status = new_status;
        vec![Event::TaskStatusChanged {
            task_id,
            old_status,
            new_status,
        }]
    }

    fn finish_task(&self, world: &mut WorldState, ctx: &mut EffectContext) -> Vec<Event> {
        let Some(task_id) = ctx.task_id.clone() else {
            return error("FinishTask: task not found");
        };
        let Some(task) = world.task(&task_id) else {
            return error("FinishTask: task not found");
        };
        let target_id = task.target_entity_id.clone();
        let completion_effects = task.completion_effects.clone();

        // Completion effects address the recipe's semantic target; default
        // it from the task when the caller did not bind one.
        if ctx.id("target").is_none() {
            ctx.set_id("target", target_id.clone());
        }

        let mut events = Vec::new();
        for raw in &completion_effects {
            let effect = Effect::from_value(raw);
            events.extend(self.execute(world, &effect, ctx));
        }

        // Detach from the host (actor if present, else target), then the
        // global index. Both removals are idempotent.
        let host_id = ctx
            .actor_id()
            .filter(|aid| world.entity(aid).is_some())
            .cloned()
            .unwrap_or_else(|| target_id.clone());
        if let Some(host) = world.entity_mut(&host_id).and_then(|e| e.task_host_mut()) {
            host.remove_task(&task_id);
        }
        if world.entity(&host_id).is_none() || host_id != target_id {
            // The snapshot may have hosted the task on the target instead.
            if let Some(host) = world.entity_mut(&target_id).and_then(|e| e.task_host_mut()) {
                host.remove_task(&task_id);
            }
        }
        world.unregister_task(&task_id);
        events.push(Event::TaskFinished { task_id });
        events
    }
}
