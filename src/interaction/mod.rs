//! Recipe table and first-match interaction resolution
//!
//! A recipe maps a verb plus target-tag/parameter predicates to either an
//! immediate effect list or, when its process declares nonzero required
//! progress, a task creation. Matching is first-match-wins in declaration
//! order; there is no conflict resolution beyond that.

use crate::core::types::EntityId;
use crate::model::{Entity, WorldState};
use serde::Deserialize;
use serde_json::Value;

/// How progress accrues for a task-producing recipe
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProgressionDef {
    #[serde(alias = "progressor_id")]
    pub progressor: String,
    pub params: serde_json::Map<String, Value>,
    pub tick_effects: Vec<Value>,
}

/// Continuous-process section of a recipe
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessDef {
    /// Absent means an instant recipe; explicit 0.0 is kept as authored.
    pub required_progress: Option<f32>,
    pub progression: Option<ProgressionDef>,
}

/// One authored interaction rule
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Recipe {
    /// Table key, filled in when the recipe db is loaded
    #[serde(skip)]
    pub recipe_id: String,
    pub verb: String,
    pub target_tags: Vec<String>,
    /// Single-key exact parameter predicate; empty = no constraint
    pub parameter_match: serde_json::Map<String, Value>,
    pub process: ProcessDef,
    /// Immediate effects, or completion effects for the task path
    pub outputs: Vec<Value>,
    /// Progression may be declared at recipe level or under `process`
    pub progression: Option<ProgressionDef>,
    /// Narration templates; `None` falls back to the renderer's defaults
    pub narrative_success: Option<String>,
    pub narrative_fail: Option<String>,
}

impl Recipe {
    /// Recipe-level progression wins over the process section.
    pub fn progression_config(&self) -> Option<&ProgressionDef> {
        self.progression.as_ref().or(self.process.progression.as_ref())
    }

    /// Completion/immediate outputs, object entries only.
    pub fn output_effects(&self) -> Vec<Value> {
        self.outputs
            .iter()
            .filter(|v| v.is_object())
            .cloned()
            .collect()
    }
}

/// A command produced by an action provider
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub verb: String,
    pub target_id: EntityId,
    pub parameters: serde_json::Map<String, Value>,
}

impl Action {
    pub fn new(verb: impl Into<String>, target_id: EntityId) -> Self {
        Self {
            verb: verb.into(),
            target_id,
            parameters: serde_json::Map::new(),
        }
    }
}

/// Why a command failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    NoTarget,
    NoRecipe,
}

impl FailReason {
    /// Stable code written into the interaction log.
    pub fn code(&self) -> &'static str {
        match self {
            FailReason::NoTarget => "NO_TARGET",
            FailReason::NoRecipe => "NO_RECIPE",
        }
    }
}

/// Outcome of resolving one command
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Matched; effects are ready for the executor. The task path arrives
    /// here too, as a single `CreateTask` effect.
    Success { recipe: Recipe, effects: Vec<Value> },
    Failed(FailReason),
}

/// The recipe table plus the matcher over it
#[derive(Debug, Clone, Default)]
pub struct InteractionEngine {
    /// Declaration order is match order.
    recipes: Vec<Recipe>,
}

impl InteractionEngine {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Build from a loaded recipe db (map id -> recipe body, entry order
    /// preserved by the loader). Malformed entries are skipped with a
    /// warning.
    pub fn from_recipe_db(db: &serde_json::Map<String, Value>) -> Self {
        let mut recipes = Vec::with_capacity(db.len());
        for (recipe_id, body) in db {
            match serde_json::from_value::<Recipe>(body.clone()) {
                Ok(mut recipe) => {
                    recipe.recipe_id = recipe_id.clone();
                    recipes.push(recipe);
                }
                Err(err) => {
                    tracing::warn!(recipe_id, %err, "skipping malformed recipe");
                }
            }
        }
        Self { recipes }
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn recipe_by_id(&self, recipe_id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.recipe_id == recipe_id)
    }

    /// First recipe with equal verb, all target tags present on the target,
    /// and a matching parameter predicate.
    pub fn find_matching_recipe(
        &self,
        verb: &str,
        target: &Entity,
        params: &serde_json::Map<String, Value>,
    ) -> Option<&Recipe> {
        self.recipes.iter().find(|recipe| {
            if recipe.verb != verb {
                return false;
            }
            if !recipe.target_tags.iter().all(|tag| target.has_tag(tag)) {
                return false;
            }
            if let Some((key, expected)) = recipe.parameter_match.iter().next() {
                if params.get(key) != Some(expected) {
                    return false;
                }
            }
            true
        })
    }

    /// Resolve a command to effects. Task-producing recipes defer to the
    /// task subsystem via a `CreateTask` effect instead of expanding their
    /// outputs here.
    pub fn process_command(&self, world: &WorldState, action: &Action) -> Resolution {
        let Some(target) = world.entity(&action.target_id) else {
            return Resolution::Failed(FailReason::NoTarget);
        };

        let Some(recipe) = self.find_matching_recipe(&action.verb, target, &action.parameters)
        else {
            return Resolution::Failed(FailReason::NoRecipe);
        };

        if recipe.process.required_progress.unwrap_or(0.0) != 0.0 {
            return Resolution::Success {
                recipe: recipe.clone(),
                effects: vec![serde_json::json!({ "effect": "CreateTask" })],
            };
        }

        let effects = expand_dynamic_outputs(target, &recipe.outputs);
        Resolution::Success {
            recipe: recipe.clone(),
            effects,
        }
    }
}

/// Replace any `dynamic_outputs_from_component` entry with the list value
/// read off the target's named component, splicing it in place.
fn expand_dynamic_outputs(target: &Entity, outputs: &[Value]) -> Vec<Value> {
    let mut effects = Vec::new();
    for entry in outputs {
        let Some(dyn_spec) = entry.get("dynamic_outputs_from_component") else {
            if entry.is_object() {
                effects.push(entry.clone());
            }
            continue;
        };
        let comp_name = dyn_spec.get("component").and_then(Value::as_str).unwrap_or("");
        let prop_name = dyn_spec.get("property").and_then(Value::as_str).unwrap_or("");
        let Some(list) = target
            .component(comp_name)
            .and_then(|c| c.list_property(prop_name))
        else {
            continue;
        };
        effects.extend(list.iter().filter(|v| v.is_object()).cloned());
    }
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EntityId;
    use crate::model::component::{self, Component, TagComponent, UnknownComponent};
    use serde_json::json;

    fn edible_target() -> Entity {
        let mut e = Entity::new(EntityId::new("apple_1"), "apple", "Apple");
        e.add_component(
            component::TAG,
            Component::Tag(TagComponent {
                tags: vec!["edible".to_string(), "item".to_string()],
            }),
        )
        .unwrap();
        e
    }

    fn consume_recipe() -> Recipe {
        serde_json::from_value::<Recipe>(json!({
            "verb": "Consume",
            "target_tags": ["edible"],
            "outputs": [
                {"effect": "ModifyProperty", "target": "agent",
                 "component": "CreatureComponent", "property": "current_nutrition",
                 "change": 30.0},
                {"effect": "DestroyEntity", "target": "target"},
            ],
        }))
        .unwrap()
    }

    #[test]
    fn test_first_match_wins_in_declaration_order() {
        let mut shadowed = consume_recipe();
        shadowed.recipe_id = "consume_a".to_string();
        let mut second = consume_recipe();
        second.recipe_id = "consume_b".to_string();
        let engine = InteractionEngine::new(vec![shadowed, second]);

        let target = edible_target();
        let found = engine
            .find_matching_recipe("Consume", &target, &serde_json::Map::new())
            .unwrap();
        assert_eq!(found.recipe_id, "consume_a");
    }

    #[test]
    fn test_tag_subset_required() {
        let mut recipe = consume_recipe();
        recipe.target_tags = vec!["edible".to_string(), "cooked".to_string()];
        let engine = InteractionEngine::new(vec![recipe]);

        let target = edible_target();
        assert!(engine
            .find_matching_recipe("Consume", &target, &serde_json::Map::new())
            .is_none());
    }

    #[test]
    fn test_parameter_match_single_key() {
        let mut recipe = consume_recipe();
        recipe.parameter_match.insert("style".to_string(), json!("raw"));
        let engine = InteractionEngine::new(vec![recipe]);
        let target = edible_target();

        assert!(engine
            .find_matching_recipe("Consume", &target, &serde_json::Map::new())
            .is_none());

        let mut params = serde_json::Map::new();
        params.insert("style".to_string(), json!("raw"));
        assert!(engine
            .find_matching_recipe("Consume", &target, &params)
            .is_some());
    }

    #[test]
    fn test_nonzero_required_progress_defers_to_task() {
        let recipe = serde_json::from_value::<Recipe>(json!({
            "verb": "Sleep",
            "process": {"required_progress": 60.0},
            "outputs": [{"effect": "ModifyProperty", "target": "agent",
                         "component": "CreatureComponent",
                         "property": "current_energy", "change": 50.0}],
        }))
        .unwrap();
        let engine = InteractionEngine::new(vec![recipe]);
        let mut world = WorldState::new();
        world.register_entity(edible_target()).unwrap();

        let resolution =
            engine.process_command(&world, &Action::new("Sleep", EntityId::new("apple_1")));
        match resolution {
            Resolution::Success { effects, .. } => {
                assert_eq!(effects, vec![json!({"effect": "CreateTask"})]);
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn test_missing_target_and_recipe_codes() {
        let engine = InteractionEngine::new(vec![consume_recipe()]);
        let mut world = WorldState::new();

        let miss = engine.process_command(&world, &Action::new("Consume", EntityId::new("ghost")));
        assert_eq!(miss, Resolution::Failed(FailReason::NoTarget));

        world.register_entity(edible_target()).unwrap();
        let wrong_verb =
            engine.process_command(&world, &Action::new("Ignite", EntityId::new("apple_1")));
        assert_eq!(wrong_verb, Resolution::Failed(FailReason::NoRecipe));
        assert_eq!(FailReason::NoRecipe.code(), "NO_RECIPE");
    }

    #[test]
    fn test_dynamic_outputs_spliced_from_component() {
        let mut target = edible_target();
        let mut data = serde_json::Map::new();
        data.insert(
            "on_harvest".to_string(),
            json!([
                {"effect": "CreateEntity", "template": "seed",
                 "destination": {"type": "location", "target": "agent"}},
            ]),
        );
        target
            .add_component(
                "HarvestComponent",
                Component::Unknown(UnknownComponent::new(data)),
            )
            .unwrap();

        let outputs = vec![
            json!({"dynamic_outputs_from_component":
                   {"component": "HarvestComponent", "property": "on_harvest"}}),
            json!({"effect": "DestroyEntity", "target": "target"}),
        ];
        let effects = expand_dynamic_outputs(&target, &outputs);
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0]["effect"], "CreateEntity");
        assert_eq!(effects[1]["effect"], "DestroyEntity");
    }
}
