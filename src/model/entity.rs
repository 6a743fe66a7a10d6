//! Entity: id, template, physical scalars, and a component map

use crate::core::error::BuildError;
use crate::core::types::EntityId;
use ahash::AHashMap;

use super::component::{self, Component, ControlComponent, TagComponent, WorkerComponent};
use super::container::ContainerComponent;

/// Which controller kind won controller resolution for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Player,
    Agent,
    Logic,
}

impl ControllerKind {
    /// Default provider routing key when the controller declares none.
    pub fn default_provider_id(&self) -> &'static str {
        match self {
            ControllerKind::Player => "player",
            ControllerKind::Agent => "",
            ControllerKind::Logic => "logic",
        }
    }
}

/// A world object: agents, items, containers are all entities
#[derive(Debug, Clone)]
pub struct Entity {
    pub entity_id: EntityId,
    pub template_id: String,
    pub name: String,
    pub volume: f32,
    pub weight: f32,
    /// component name -> state; kinds unique per entity
    components: AHashMap<String, Component>,
}

impl Entity {
    pub fn new(entity_id: EntityId, template_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entity_id,
            template_id: template_id.into(),
            name: name.into(),
            volume: 1.0,
            weight: 1.0,
            components: AHashMap::new(),
        }
    }

    pub fn add_component(&mut self, name: impl Into<String>, component: Component) -> Result<(), BuildError> {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(BuildError::DuplicateComponent {
                entity_id: self.entity_id.to_string(),
                component: name,
            });
        }
        self.components.insert(name, component);
        Ok(())
    }

    /// Detach a component by name; idempotent.
    pub fn remove_component(&mut self, name: &str) -> Option<Component> {
        self.components.remove(name)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    // --- Tag helpers ---

    pub fn tag(&self) -> Option<&TagComponent> {
        match self.components.get(component::TAG) {
            Some(Component::Tag(t)) => Some(t),
            _ => None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag().map(|t| t.has_tag(tag)).unwrap_or(false)
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.tag().map(|t| t.tags.clone()).unwrap_or_default()
    }

    // --- Typed accessors ---

    pub fn container(&self) -> Option<&ContainerComponent> {
        match self.components.get(component::CONTAINER) {
            Some(Component::Container(c)) => Some(c),
            _ => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut ContainerComponent> {
        match self.components.get_mut(component::CONTAINER) {
            Some(Component::Container(c)) => Some(c),
            _ => None,
        }
    }

    pub fn worker(&self) -> Option<&WorkerComponent> {
        match self.components.get(component::WORKER) {
            Some(Component::Worker(w)) => Some(w),
            _ => None,
        }
    }

    pub fn worker_mut(&mut self) -> Option<&mut WorkerComponent> {
        match self.components.get_mut(component::WORKER) {
            Some(Component::Worker(w)) => Some(w),
            _ => None,
        }
    }

    pub fn arbiter(&self) -> Option<&super::component::DecisionArbiterComponent> {
        match self.components.get(component::DECISION_ARBITER) {
            Some(Component::DecisionArbiter(a)) => Some(a),
            _ => None,
        }
    }

    pub fn creature_mut(&mut self) -> Option<&mut super::component::CreatureComponent> {
        match self.components.get_mut(component::CREATURE) {
            Some(Component::Creature(c)) => Some(c),
            _ => None,
        }
    }

    pub fn creature(&self) -> Option<&super::component::CreatureComponent> {
        match self.components.get(component::CREATURE) {
            Some(Component::Creature(c)) => Some(c),
            _ => None,
        }
    }

    pub fn task_host(&self) -> Option<&super::component::TaskHostComponent> {
        match self.components.get(component::TASK_HOST) {
            Some(Component::TaskHost(h)) => Some(h),
            _ => None,
        }
    }

    pub fn task_host_mut(&mut self) -> Option<&mut super::component::TaskHostComponent> {
        match self.components.get_mut(component::TASK_HOST) {
            Some(Component::TaskHost(h)) => Some(h),
            _ => None,
        }
    }

    /// Resolve the enabled controller with fixed precedence:
    /// Player > Agent > Logic. `None` means the entity never enters
    /// arbitration.
    pub fn resolve_enabled_controller(&self) -> Option<(ControllerKind, &ControlComponent)> {
        let candidates = [
            (ControllerKind::Player, component::PLAYER_CONTROL),
            (ControllerKind::Agent, component::AGENT_CONTROL),
            (ControllerKind::Logic, component::LOGIC_CONTROL),
        ];
        for (kind, name) in candidates {
            let ctrl = match self.components.get(name) {
                Some(Component::AgentControl(c))
                | Some(Component::PlayerControl(c))
                | Some(Component::LogicControl(c)) => Some(c),
                _ => None,
            };
            if let Some(c) = ctrl {
                if c.enabled {
                    return Some((kind, c));
                }
            }
        }
        None
    }

    /// Fill derived state left unset by authored data.
    pub fn ensure_initialized(&mut self) {
        if let Some(creature) = self.creature_mut() {
            creature.ensure_initialized();
        }
    }
}
