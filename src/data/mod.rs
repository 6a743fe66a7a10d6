//! Data bundle definitions
//!
//! serde shapes for the authored JSON: entity templates, the recipe db,
//! and the initial world snapshot. The bundle is read once at startup and
//! consumed by the builder; the core exposes no file formats beyond these.

pub mod builder;
pub mod loader;

use ahash::AHashMap;
use serde::Deserialize;
use serde_json::Value;

pub use builder::{build_world_state, create_entity_from_template};
pub use loader::load_data_bundle;

/// One entity template: display name plus raw component payloads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateDef {
    pub name: String,
    /// component name -> component payload; typed components are built by
    /// the builder, everything else lands as `Unknown`
    pub components: serde_json::Map<String, Value>,
}

/// Scalar world-state fields of the snapshot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorldStateDef {
    pub current_tick: u64,
}

/// One entity placement inside a location
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlacementDef {
    pub template_id: String,
    pub instance_id: String,
    pub component_overrides: serde_json::Map<String, Value>,
    /// Id of the containing entity (or a location id); wired in a second
    /// pass after every entity exists
    pub parent_container: String,
}

/// One location and the entities declared inside it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocationDef {
    pub location_id: String,
    #[serde(alias = "location_name")]
    pub name: String,
    pub description: String,
    pub entities: Vec<PlacementDef>,
    pub connections: AHashMap<String, String>,
}

/// Persisted task snapshot restored at build time
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskSnapshot {
    pub task_id: String,
    #[serde(alias = "verb")]
    pub task_type: String,
    #[serde(alias = "host_entity_id")]
    pub target_entity_id: String,
    pub progress: f32,
    pub required_progress: Option<f32>,
    pub multiple_entity: bool,
    pub task_status: String,
    pub assigned_agent_ids: Vec<String>,
    pub parameters: serde_json::Map<String, Value>,
    pub completion_effects: Vec<Value>,
    pub progressor_id: String,
    pub progressor_params: serde_json::Map<String, Value>,
    pub tick_effects: Vec<Value>,
    /// When set, the task is re-assigned to this agent's worker
    pub current_agent_id: String,
}

/// The initial world snapshot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorldDef {
    pub world_state: WorldStateDef,
    pub locations: Vec<LocationDef>,
    pub tasks: Vec<TaskSnapshot>,
}

/// Everything the simulation needs from disk
#[derive(Debug, Clone, Default)]
pub struct DataBundle {
    pub entity_templates: AHashMap<String, TemplateDef>,
    /// recipe id -> recipe body, entry order preserved (match order)
    pub recipes: serde_json::Map<String, Value>,
    pub world: WorldDef,
}
