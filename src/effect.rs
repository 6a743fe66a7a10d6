//! Declarative world-mutation requests
//!
//! Effects arrive as data (recipe outputs, task tick/completion lists,
//! persisted snapshots), so the closed union is parsed from
//! `serde_json::Value` rather than derived: unknown or malformed kinds
//! decode into `Effect::Unknown`, which the executor reports as an error
//! event instead of panicking.
//!
//! Fields named `target` hold *context keys* ("target", "agent",
//! "entity_to_destroy"), not entity ids; the executor resolves them
//! against the effect context's id map.

use crate::core::types::TaskId;
use serde_json::Value;

/// Where a created entity should be placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationKind {
    Container,
    Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub kind: DestinationKind,
    /// Context key naming the parent container entity (for `Container`)
    pub target: String,
}

/// The closed set of effect opcodes
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ModifyProperty {
        target: String,
        component: String,
        property: String,
        change: f32,
    },
    CreateEntity {
        template: String,
        destination: Option<Destination>,
        instance_id: Option<String>,
    },
    DestroyEntity {
        target: String,
    },
    TransferEntity,
    AddCondition {
        target: String,
        condition_id: String,
    },
    RemoveCondition {
        target: String,
        condition_id: String,
    },
    ConsumeInputs,
    CreateTask,
    ProgressTask {
        task_id: Option<TaskId>,
        delta: f32,
    },
    UpdateTaskStatus {
        task_id: Option<TaskId>,
        status: String,
    },
    FinishTask,
    /// Catch-all for unrecognized or tag-less payloads
    Unknown(Value),
}

fn get_str(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

fn get_str_or(v: &Value, key: &str, default: &str) -> String {
    get_str(v, key).unwrap_or_else(|| default.to_string())
}

fn get_f32(v: &Value, key: &str, default: f32) -> f32 {
    v.get(key).and_then(Value::as_f64).map(|f| f as f32).unwrap_or(default)
}

impl Effect {
    /// Parse one data-described effect. Never fails: anything that is not
    /// a recognizable opcode comes back as `Unknown`.
    pub fn from_value(value: &Value) -> Effect {
        let Some(tag) = value.get("effect").and_then(Value::as_str) else {
            return Effect::Unknown(value.clone());
        };

        match tag {
            "ModifyProperty" => Effect::ModifyProperty {
                target: get_str_or(value, "target", "target"),
                component: get_str_or(value, "component", ""),
                property: get_str_or(value, "property", ""),
                change: get_f32(value, "change", 0.0),
            },
            "CreateEntity" => {
                let destination = value.get("destination").and_then(|d| {
                    let kind = match d.get("type").and_then(Value::as_str) {
                        Some("container") => DestinationKind::Container,
                        Some("location") => DestinationKind::Location,
                        _ => return None,
                    };
                    Some(Destination {
                        kind,
                        target: get_str_or(d, "target", ""),
                    })
                });
                Effect::CreateEntity {
                    template: get_str_or(value, "template", ""),
                    destination,
                    instance_id: get_str(value, "instance_id"),
                }
            }
            "DestroyEntity" => Effect::DestroyEntity {
                target: get_str_or(value, "target", "entity_to_destroy"),
            },
            "TransferEntity" => Effect::TransferEntity,
            "AddCondition" => Effect::AddCondition {
                target: get_str_or(value, "target", "target"),
                condition_id: get_str_or(value, "condition_id", ""),
            },
            "RemoveCondition" => Effect::RemoveCondition {
                target: get_str_or(value, "target", "target"),
                condition_id: get_str_or(value, "condition_id", ""),
            },
            "ConsumeInputs" => Effect::ConsumeInputs,
            "CreateTask" => Effect::CreateTask,
            "ProgressTask" => Effect::ProgressTask {
                task_id: get_str(value, "task_id").map(TaskId::new),
                delta: get_f32(value, "delta", 0.0),
            },
            "UpdateTaskStatus" => Effect::UpdateTaskStatus {
                task_id: get_str(value, "task_id").map(TaskId::new),
                status: get_str_or(value, "status", ""),
            },
            "FinishTask" => Effect::FinishTask,
            _ => Effect::Unknown(value.clone()),
        }
    }

    /// Parse a list of data-described effects.
    pub fn from_values(values: &[Value]) -> Vec<Effect> {
        values.iter().map(Effect::from_value).collect()
    }
}
