//! Data bundle directory loader
//!
//! Reads `World.json`, `Recipes.json`, and every `Entities/*.json` from a
//! data directory. Later entity files overwrite earlier ones on key
//! collisions, matching the authoring tool's merge behavior.

use crate::core::error::DataError;
use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{DataBundle, TemplateDef, WorldDef};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| DataError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Accepts either a project root containing `data/`, or the data
/// directory itself.
fn resolve_data_dir(root: &Path) -> Result<PathBuf, DataError> {
    let nested = root.join("data");
    if nested.is_dir() {
        return Ok(nested);
    }
    let is_data_dir = root
        .file_name()
        .map(|n| n.eq_ignore_ascii_case("data"))
        .unwrap_or(false);
    if is_data_dir && root.is_dir() {
        return Ok(root.to_path_buf());
    }
    Err(DataError::MissingDataDir(root.display().to_string()))
}

/// Load the whole bundle from disk.
pub fn load_data_bundle(root: &Path) -> Result<DataBundle, DataError> {
    let data_dir = resolve_data_dir(root)?;

    let world: WorldDef = read_json(&data_dir.join("World.json"))?;
    let recipes: serde_json::Map<String, Value> = read_json(&data_dir.join("Recipes.json"))?;

    let mut entity_templates: AHashMap<String, TemplateDef> = AHashMap::new();
    let entities_dir = data_dir.join("Entities");
    if entities_dir.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(&entities_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|x| x == "json").unwrap_or(false))
            .collect();
        files.sort();
        for path in files {
            let templates: AHashMap<String, TemplateDef> = read_json(&path)?;
            debug!(file = %path.display(), count = templates.len(), "merged entity templates");
            entity_templates.extend(templates);
        }
    }

    Ok(DataBundle {
        entity_templates,
        recipes,
        world,
    })
}
