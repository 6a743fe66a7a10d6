//! Task: a multi-tick unit of progress occupying an actor's action rights

use crate::core::types::{EntityId, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Inactive,
    InProgress,
    Paused,
    Completed,
}

impl TaskStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Inactive" => Some(TaskStatus::Inactive),
            "InProgress" => Some(TaskStatus::InProgress),
            "Paused" => Some(TaskStatus::Paused),
            "Completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Inactive => "Inactive",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Paused => "Paused",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Inactive
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task created by the recipe matcher or restored from a snapshot.
///
/// Referenced from exactly one task-host component and mirrored in the
/// world's task index for O(1) lookup.
#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: TaskId,
    /// Verb this task was created from
    pub task_type: String,
    pub target_entity_id: EntityId,

    pub progress: f32,
    pub required_progress: f32,

    pub multiple_entity: bool,
    pub assigned_agent_ids: Vec<EntityId>,
    pub status: TaskStatus,
    pub parameters: serde_json::Map<String, Value>,

    /// How progress accrues, solidified from the recipe at creation
    pub progressor_id: String,
    pub progressor_params: serde_json::Map<String, Value>,
    /// Effects executed every tick while the task runs
    pub tick_effects: Vec<Value>,
    /// Effects executed exactly once at completion
    pub completion_effects: Vec<Value>,
}

impl Task {
    pub fn new(task_type: impl Into<String>, target_entity_id: EntityId) -> Self {
        Self {
            task_id: TaskId::fresh(),
            task_type: task_type.into(),
            target_entity_id,
            progress: 0.0,
            required_progress: 100.0,
            multiple_entity: false,
            assigned_agent_ids: Vec::new(),
            status: TaskStatus::Inactive,
            parameters: serde_json::Map::new(),
            progressor_id: String::new(),
            progressor_params: serde_json::Map::new(),
            tick_effects: Vec::new(),
            completion_effects: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.required_progress
    }

    pub fn remaining_progress(&self) -> f32 {
        (self.required_progress - self.progress).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_iff_progress_reaches_required() {
        let mut task = Task::new("Sleep", EntityId::new("bed_01"));
        task.required_progress = 60.0;
        task.progress = 59.9;
        assert!(!task.is_complete());
        task.progress = 60.0;
        assert!(task.is_complete());
        assert_eq!(task.remaining_progress(), 0.0);
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for s in ["Inactive", "InProgress", "Paused", "Completed"] {
            assert_eq!(TaskStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(TaskStatus::parse("Running").is_none());
    }
}
