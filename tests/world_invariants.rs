//! Index invariants under arbitrary transfer sequences.
//!
//! Whatever order items get moved between rooms and containers, each
//! entity must stay in at most one location index and at most one
//! container slot, contained items must resolve to their holder's
//! location, and the spatial index must keep listing them there.

use hollowden::core::types::{EntityId, LocationId};
use hollowden::effect::Effect;
use hollowden::executor::{EffectContext, WorldExecutor};
use hollowden::model::component::{self, Component, TagComponent};
use hollowden::model::container::ContainerComponent;
use hollowden::model::{Entity, Location, WorldState};
use proptest::prelude::*;

const ITEMS: [&str; 5] = ["item_0", "item_1", "item_2", "item_3", "item_4"];
const PLACES: [&str; 4] = ["bedroom", "kitchen", "chest_a", "chest_b"];

fn build_world() -> WorldState {
    let mut world = WorldState::new();
    for (id, name) in [("bedroom", "Bedroom"), ("kitchen", "Kitchen")] {
        world
            .register_location(Location::new(LocationId::new(id), name))
            .unwrap();
    }
    for id in ["chest_a", "chest_b"] {
        let mut chest = Entity::new(EntityId::new(id), "chest", id);
        chest
            .add_component(
                component::CONTAINER,
                Component::Container(ContainerComponent::with_default_slot()),
            )
            .unwrap();
        world.register_entity(chest).unwrap();
        world.ensure_entity_in_location(&id.into(), &LocationId::new("bedroom"));
    }
    for id in ITEMS {
        let mut item = Entity::new(EntityId::new(id), "item", id);
        item.add_component(
            component::TAG,
            Component::Tag(TagComponent {
                tags: vec!["item".to_string()],
            }),
        )
        .unwrap();
        world.register_entity(item).unwrap();
        world.ensure_entity_in_location(&id.into(), &LocationId::new("bedroom"));
    }
    world
}

/// Where the entity currently is, phrased as a transfer source id.
fn source_of(world: &WorldState, entity_id: &EntityId) -> EntityId {
    if let Some(holder) = world.find_container_holding(entity_id) {
        return holder;
    }
    world
        .location_of(entity_id)
        .map(|loc| EntityId::new(loc.as_str()))
        .expect("entity fell out of every index")
}

fn assert_invariants(world: &WorldState) {
    for eid in world.entity_ids() {
        let memberships = world
            .location_ids()
            .iter()
            .filter(|loc| world.location(loc).unwrap().contains(eid))
            .count();
        assert!(memberships <= 1, "{eid} indexed in {memberships} locations");

        let mut slot_count = 0;
        for holder in world.entity_ids() {
            if let Some(cc) = world.entity(holder).and_then(|e| e.container()) {
                for slot in &cc.slots {
                    slot_count += slot.items.iter().filter(|i| *i == eid).count();
                }
            }
        }
        assert!(slot_count <= 1, "{eid} held by {slot_count} slots");

        // a contained entity lives where its holder lives, and the
        // location index agrees
        if let Some(holder) = world.find_container_holding(eid) {
            let holder_loc = world.location_of(&holder);
            assert_eq!(world.location_of(eid), holder_loc);
            if let Some(loc) = holder_loc {
                assert!(
                    world.location(&loc).unwrap().contains(eid),
                    "{eid} missing from {loc} while held there"
                );
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transfers_never_corrupt_indexes(
        moves in proptest::collection::vec((0usize..ITEMS.len(), 0usize..PLACES.len()), 1..40)
    ) {
        let mut world = build_world();
        let executor = WorldExecutor::default();

        for (item_idx, place_idx) in moves {
            let item = EntityId::new(ITEMS[item_idx]);
            let source = source_of(&world, &item);
            let dest = EntityId::new(PLACES[place_idx]);

            let mut ctx = EffectContext::new()
                .with_id("entity", item)
                .with_id("source", source)
                .with_id("destination", dest);
            // failures (same-place moves etc.) surface as error events and
            // must leave the indexes intact either way
            executor.execute(&mut world, &Effect::TransferEntity, &mut ctx);

            assert_invariants(&world);
        }
    }

    #[test]
    fn destroy_leaves_no_residual_references(
        moves in proptest::collection::vec((0usize..ITEMS.len(), 0usize..PLACES.len()), 0..20),
        victim in 0usize..ITEMS.len(),
    ) {
        let mut world = build_world();
        let executor = WorldExecutor::default();

        for (item_idx, place_idx) in moves {
            let item = EntityId::new(ITEMS[item_idx]);
            let source = source_of(&world, &item);
            let mut ctx = EffectContext::new()
                .with_id("entity", item)
                .with_id("source", source)
                .with_id("destination", EntityId::new(PLACES[place_idx]));
            executor.execute(&mut world, &Effect::TransferEntity, &mut ctx);
        }

        let victim_id = EntityId::new(ITEMS[victim]);
        let mut ctx = EffectContext::new().with_id("entity_to_destroy", victim_id.clone());
        executor.execute(
            &mut world,
            &Effect::DestroyEntity { target: "entity_to_destroy".to_string() },
            &mut ctx,
        );

        prop_assert!(world.entity(&victim_id).is_none());
        for loc in world.location_ids() {
            prop_assert!(!world.location(loc).unwrap().contains(&victim_id));
        }
        prop_assert!(world.find_container_holding(&victim_id).is_none());
        assert_invariants(&world);
    }
}
