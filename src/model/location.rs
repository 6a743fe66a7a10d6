//! Location: spatial index of entity ids plus named connections

use crate::core::types::{EntityId, LocationId};
use ahash::AHashMap;

/// A place in the world. Owns the membership list, never the entities.
#[derive(Debug, Clone)]
pub struct Location {
    pub location_id: LocationId,
    pub name: String,
    pub description: String,
    /// Ids directly "in" this location; insertion order is kept but carries
    /// no meaning.
    pub entities_in_location: Vec<EntityId>,
    /// path id -> target location id (stored for data round-trips; the core
    /// does not route through them)
    pub connections: AHashMap<String, LocationId>,
}

impl Location {
    pub fn new(location_id: LocationId, name: impl Into<String>) -> Self {
        Self {
            location_id,
            name: name.into(),
            description: String::new(),
            entities_in_location: Vec::new(),
            connections: AHashMap::new(),
        }
    }

    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.entities_in_location.contains(entity_id)
    }

    /// Add an id to the membership list; idempotent, returns whether the
    /// list changed.
    pub fn add_entity_id(&mut self, entity_id: EntityId) -> bool {
        if self.contains(&entity_id) {
            return false;
        }
        self.entities_in_location.push(entity_id);
        true
    }

    /// Remove an id from the membership list; idempotent.
    pub fn remove_entity_id(&mut self, entity_id: &EntityId) -> bool {
        if let Some(pos) = self.entities_in_location.iter().position(|e| e == entity_id) {
            self.entities_in_location.remove(pos);
            true
        } else {
            false
        }
    }
}
