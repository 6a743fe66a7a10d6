//! Container component: slotted storage of entity ids
//!
//! A container holds ids only; the entities themselves stay in the world
//! table. Slots are kept in declaration order so that slot selection and
//! perception expansion are deterministic.

use crate::core::types::EntityId;
use serde::{Deserialize, Serialize};

/// Per-slot configuration, authored in entity templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    pub capacity_count: usize,
    pub capacity_volume: f32,
    pub accepted_tags: Vec<String>,
    /// Contents of a transparent slot are visible to perception even
    /// though they are physically contained.
    pub transparent: bool,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            capacity_count: 999,
            capacity_volume: 999.0,
            accepted_tags: Vec::new(),
            transparent: false,
        }
    }
}

/// One storage slot: configuration plus the ordered ids it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    #[serde(default)]
    pub config: SlotConfig,
    #[serde(default)]
    pub items: Vec<EntityId>,
}

impl Slot {
    pub fn new(id: impl Into<String>, config: SlotConfig) -> Self {
        Self {
            id: id.into(),
            config,
            items: Vec::new(),
        }
    }

    fn has_capacity(&self) -> bool {
        self.items.len() < self.config.capacity_count
    }

    fn accepts(&self, item_tags: &[String]) -> bool {
        self.config
            .accepted_tags
            .iter()
            .all(|t| item_tags.iter().any(|it| it == t))
    }
}

/// Slotted container state attached to an entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerComponent {
    pub slots: Vec<Slot>,
}

impl ContainerComponent {
    /// A single default slot named "main", used when data declares a parent
    /// container on an entity that has no container component.
    pub fn with_default_slot() -> Self {
        Self {
            slots: vec![Slot::new("main", SlotConfig::default())],
        }
    }

    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }

    pub fn slot_mut(&mut self, slot_id: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.id == slot_id)
    }

    pub fn all_item_ids(&self) -> Vec<EntityId> {
        self.slots
            .iter()
            .flat_map(|s| s.items.iter().cloned())
            .collect()
    }

    pub fn has_item(&self, item_id: &EntityId) -> bool {
        self.slots.iter().any(|s| s.items.contains(item_id))
    }

    pub fn remove_item(&mut self, item_id: &EntityId) -> bool {
        for slot in &mut self.slots {
            if let Some(pos) = slot.items.iter().position(|i| i == item_id) {
                slot.items.remove(pos);
                return true;
            }
        }
        false
    }

    /// Insert an item id into a slot.
    ///
    /// The id must not already be present anywhere in this container; the
    /// chosen slot must have count capacity and its accepted-tag filter must
    /// all be present on the item. Returns false when no slot qualifies.
    pub fn add_item(
        &mut self,
        item_id: &EntityId,
        item_tags: &[String],
        target_slot_id: Option<&str>,
    ) -> bool {
        if item_id.as_str().is_empty() || self.has_item(item_id) {
            return false;
        }

        let slot = match target_slot_id {
            Some(sid) => self.slot_mut(sid),
            None => self
                .slots
                .iter_mut()
                .find(|s| s.has_capacity() && s.accepts(item_tags)),
        };

        match slot {
            Some(slot) if slot.has_capacity() => {
                slot.items.push(item_id.clone());
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_slot(id: &str, cap: usize) -> Slot {
        Slot::new(
            id,
            SlotConfig {
                capacity_count: cap,
                ..SlotConfig::default()
            },
        )
    }

    #[test]
    fn test_add_respects_capacity() {
        let mut cc = ContainerComponent {
            slots: vec![small_slot("main", 1)],
        };
        assert!(cc.add_item(&"a".into(), &[], None));
        assert!(!cc.add_item(&"b".into(), &[], None));
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut cc = ContainerComponent::with_default_slot();
        assert!(cc.add_item(&"a".into(), &[], None));
        assert!(!cc.add_item(&"a".into(), &[], None));
        assert_eq!(cc.all_item_ids().len(), 1);
    }

    #[test]
    fn test_accepted_tags_filter() {
        let mut cc = ContainerComponent {
            slots: vec![Slot::new(
                "gems",
                SlotConfig {
                    accepted_tags: vec!["gem".to_string()],
                    ..SlotConfig::default()
                },
            )],
        };
        assert!(!cc.add_item(&"rock_1".into(), &["rock".to_string()], None));
        assert!(cc.add_item(&"ruby_1".into(), &["gem".to_string()], None));
    }

    #[test]
    fn test_remove_item() {
        let mut cc = ContainerComponent::with_default_slot();
        cc.add_item(&"a".into(), &[], None);
        assert!(cc.remove_item(&"a".into()));
        assert!(!cc.remove_item(&"a".into()));
        assert!(cc.all_item_ids().is_empty());
    }
}
