//! Events emitted by the effect executor and the scheduler
//!
//! Events are the observable output of every world mutation. The executor
//! returns them from `execute`, the world appends them to its durable log,
//! and the scheduler surfaces the per-tick buffer to callers.

use crate::core::types::{EntityId, LocationId, TaskId, Tick};
use crate::model::task::TaskStatus;
use serde::Serialize;

/// A single world event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    TickAdvanced {
        total_ticks: Tick,
        time: String,
    },
    PropertyModified {
        entity_id: EntityId,
        component: String,
        property: String,
        delta: f32,
        new_value: f32,
    },
    EntityCreated {
        entity_id: EntityId,
        template_id: String,
        placed: bool,
    },
    EntityDestroyed {
        entity_id: EntityId,
    },
    EntityTransferred {
        entity_id: EntityId,
    },
    ConditionAdded {
        entity_id: EntityId,
        condition_id: String,
    },
    ConditionRemoved {
        entity_id: EntityId,
        condition_id: String,
    },
    TaskCreated {
        task_id: TaskId,
        target_entity_id: EntityId,
    },
    TaskAssigned {
        task_id: TaskId,
        agent_id: EntityId,
    },
    TaskProgressed {
        task_id: TaskId,
        delta: f32,
        new_progress: f32,
        required: f32,
    },
    TaskStatusChanged {
        task_id: TaskId,
        old_status: TaskStatus,
        new_status: TaskStatus,
    },
    TaskFinished {
        task_id: TaskId,
    },
    TaskInterrupted {
        task_id: TaskId,
        reason: String,
    },
    /// Business-logic failure inside the executor. Reported, never thrown.
    ExecutorError {
        message: String,
    },
}

impl Event {
    /// Stable name for filtering/printing.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TickAdvanced { .. } => "TickAdvanced",
            Event::PropertyModified { .. } => "PropertyModified",
            Event::EntityCreated { .. } => "EntityCreated",
            Event::EntityDestroyed { .. } => "EntityDestroyed",
            Event::EntityTransferred { .. } => "EntityTransferred",
            Event::ConditionAdded { .. } => "ConditionAdded",
            Event::ConditionRemoved { .. } => "ConditionRemoved",
            Event::TaskCreated { .. } => "TaskCreated",
            Event::TaskAssigned { .. } => "TaskAssigned",
            Event::TaskProgressed { .. } => "TaskProgressed",
            Event::TaskStatusChanged { .. } => "TaskStatusChanged",
            Event::TaskFinished { .. } => "TaskFinished",
            Event::TaskInterrupted { .. } => "TaskInterrupted",
            Event::ExecutorError { .. } => "ExecutorError",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Event::ExecutorError { .. })
    }
}

/// Append-only world event log entry
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub tick: Tick,
    /// Actor location snapshot, used for "visible in same location"
    /// filtering.
    pub location_id: Option<LocationId>,
    pub actor_id: Option<EntityId>,
    pub event: Event,
}

/// Outcome of an interaction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionStatus {
    Success,
    Failed,
}

/// Append-only interaction log entry (recipe/attempt level)
///
/// Carries name snapshots so narrative can still be rendered after the
/// entities involved are destroyed.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    pub seq: u64,
    pub tick: Tick,
    pub location_id: Option<LocationId>,
    pub actor_id: EntityId,
    pub actor_name: String,
    pub verb: String,
    pub target_id: EntityId,
    pub target_name: String,
    pub recipe_id: String,
    pub status: InteractionStatus,
    pub reason: String,
}
