//! Component state attached to entities
//!
//! A closed tagged union over the known component kinds, with an
//! `Unknown` variant carrying an opaque key-value map for not-yet-typed
//! kinds coming out of authored data. Matches stay compiler-checked while
//! forward compatibility is preserved.
//!
//! Components hold no back-reference to their entity; lookups always go
//! entity -> component.

use crate::core::types::TaskId;
use crate::sim::interrupt::InterruptRule;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::container::ContainerComponent;

pub const TAG: &str = "TagComponent";
pub const CONTAINER: &str = "ContainerComponent";
pub const CREATURE: &str = "CreatureComponent";
pub const AGENT: &str = "AgentComponent";
pub const AGENT_CONTROL: &str = "AgentControlComponent";
pub const PLAYER_CONTROL: &str = "PlayerControlComponent";
pub const LOGIC_CONTROL: &str = "LogicControlComponent";
pub const DECISION_ARBITER: &str = "DecisionArbiterComponent";
pub const TASK_HOST: &str = "TaskHostComponent";
pub const WORKER: &str = "WorkerComponent";

/// Polymorphic component state
#[derive(Debug, Clone)]
pub enum Component {
    Tag(TagComponent),
    Container(ContainerComponent),
    Creature(CreatureComponent),
    Agent(AgentComponent),
    AgentControl(ControlComponent),
    PlayerControl(ControlComponent),
    LogicControl(ControlComponent),
    DecisionArbiter(DecisionArbiterComponent),
    TaskHost(TaskHostComponent),
    Worker(WorkerComponent),
    /// Raw payload for component kinds the core has no typed model for.
    Unknown(UnknownComponent),
}

impl Component {
    /// Canonical map key for typed variants. `Unknown` components keep the
    /// name they were authored under.
    pub fn canonical_name(&self) -> Option<&'static str> {
        match self {
            Component::Tag(_) => Some(TAG),
            Component::Container(_) => Some(CONTAINER),
            Component::Creature(_) => Some(CREATURE),
            Component::Agent(_) => Some(AGENT),
            Component::AgentControl(_) => Some(AGENT_CONTROL),
            Component::PlayerControl(_) => Some(PLAYER_CONTROL),
            Component::LogicControl(_) => Some(LOGIC_CONTROL),
            Component::DecisionArbiter(_) => Some(DECISION_ARBITER),
            Component::TaskHost(_) => Some(TASK_HOST),
            Component::Worker(_) => Some(WORKER),
            Component::Unknown(_) => None,
        }
    }

    /// Read a numeric property off this component, covering both typed
    /// creature stats and opaque data maps.
    pub fn numeric_property(&self, name: &str) -> Option<f32> {
        match self {
            Component::Creature(c) => c.property(name),
            Component::Unknown(u) => u.data.get(name).and_then(Value::as_f64).map(|v| v as f32),
            _ => None,
        }
    }

    /// Read a list-valued property, used by dynamic recipe outputs.
    pub fn list_property<'a>(&'a self, name: &str) -> Option<&'a Vec<Value>> {
        match self {
            Component::Unknown(u) => u.data.get(name).and_then(Value::as_array),
            _ => None,
        }
    }
}

/// Free-form tags used by recipe matching and slot filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagComponent {
    pub tags: Vec<String>,
}

impl TagComponent {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Numeric vitals modified by effects and read by interrupt rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureComponent {
    pub max_hp: f32,
    pub max_energy: f32,
    pub max_nutrition: f32,
    pub current_hp: Option<f32>,
    pub current_energy: Option<f32>,
    pub current_nutrition: Option<f32>,
}

impl Default for CreatureComponent {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            max_energy: 100.0,
            max_nutrition: 100.0,
            current_hp: None,
            current_energy: None,
            current_nutrition: None,
        }
    }
}

impl CreatureComponent {
    /// Fill unset current values from their maxima.
    pub fn ensure_initialized(&mut self) {
        if self.current_hp.is_none() {
            self.current_hp = Some(self.max_hp);
        }
        if self.current_energy.is_none() {
            self.current_energy = Some(self.max_energy);
        }
        if self.current_nutrition.is_none() {
            self.current_nutrition = Some(self.max_nutrition);
        }
    }

    pub fn property(&self, name: &str) -> Option<f32> {
        match name {
            "max_hp" => Some(self.max_hp),
            "max_energy" => Some(self.max_energy),
            "max_nutrition" => Some(self.max_nutrition),
            "current_hp" => self.current_hp,
            "current_energy" => self.current_energy,
            "current_nutrition" => self.current_nutrition,
            _ => None,
        }
    }

    /// Add a delta to a named property; returns the new value, or `None`
    /// when the property does not exist (or is still uninitialized).
    pub fn add_to_property(&mut self, name: &str, delta: f32) -> Option<f32> {
        self.ensure_initialized();
        let slot = match name {
            "max_hp" => &mut self.max_hp,
            "max_energy" => &mut self.max_energy,
            "max_nutrition" => &mut self.max_nutrition,
            "current_hp" => self.current_hp.as_mut()?,
            "current_energy" => self.current_energy.as_mut()?,
            "current_nutrition" => self.current_nutrition.as_mut()?,
            _ => return None,
        };
        *slot += delta;
        Some(*slot)
    }
}

/// Narrative identity of an agent (consumed by external planners)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentComponent {
    pub agent_name: String,
    pub personality_summary: String,
    pub common_knowledge_summary: String,
}

/// Controller switch: which mechanism may drive this entity
///
/// The same shape backs player, agent and logic control; the variant of the
/// enclosing `Component` carries the distinction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlComponent {
    /// Disabled controllers are skipped by controller resolution, which
    /// freezes the entity without detaching the component.
    pub enabled: bool,
    /// Action-provider routing key (empty = scheduler default)
    pub provider_id: String,
}

impl Default for ControlComponent {
    fn default() -> Self {
        Self {
            enabled: true,
            provider_id: String::new(),
        }
    }
}

/// Priority-ordered interrupt ruleset
#[derive(Debug, Clone, Default)]
pub struct DecisionArbiterComponent {
    /// Sorted ascending by priority value (lowest checked first).
    pub ruleset: Vec<InterruptRule>,
}

impl DecisionArbiterComponent {
    pub fn new(mut ruleset: Vec<InterruptRule>) -> Self {
        ruleset.sort_by_key(|r| r.priority());
        Self { ruleset }
    }
}

/// Task bookkeeping host: ids only, tasks live in the world index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskHostComponent {
    pub task_ids: Vec<TaskId>,
}

impl TaskHostComponent {
    /// Attach a task id; rejects duplicates so the conflict is handled
    /// deliberately by the caller.
    pub fn add_task(&mut self, task_id: TaskId) -> Result<(), TaskId> {
        if self.task_ids.contains(&task_id) {
            return Err(task_id);
        }
        self.task_ids.push(task_id);
        Ok(())
    }

    /// Detach a task id; idempotent.
    pub fn remove_task(&mut self, task_id: &TaskId) -> bool {
        if let Some(pos) = self.task_ids.iter().position(|t| t == task_id) {
            self.task_ids.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn has_task(&self, task_id: &TaskId) -> bool {
        self.task_ids.contains(task_id)
    }
}

/// Action-rights holder: the task currently occupying this actor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerComponent {
    pub current_task_id: Option<TaskId>,
}

impl WorkerComponent {
    pub fn has_task(&self) -> bool {
        self.current_task_id.is_some()
    }

    pub fn assign_task(&mut self, task_id: TaskId) {
        self.current_task_id = Some(task_id);
    }

    pub fn stop_task(&mut self) {
        self.current_task_id = None;
    }
}

/// Opaque key-value payload for unmigrated component kinds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnknownComponent {
    pub data: serde_json::Map<String, Value>,
}

impl UnknownComponent {
    pub fn new(data: serde_json::Map<String, Value>) -> Self {
        Self { data }
    }
}
