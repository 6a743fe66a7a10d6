use thiserror::Error;

/// Structural errors raised while constructing a world from data.
///
/// These are configuration-time failures: they abort the build instead of
/// being tolerated, unlike effect-execution errors which are reported as
/// `Event::ExecutorError` and never unwind.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("duplicate entity id: {0}")]
    DuplicateEntityId(String),

    #[error("duplicate location id: {0}")]
    DuplicateLocationId(String),

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("entity template not found: {0}")]
    TemplateNotFound(String),

    #[error("component already exists on entity {entity_id}: {component}")]
    DuplicateComponent { entity_id: String, component: String },

    #[error("container graph cycle involving entity: {0}")]
    ContainerCycle(String),

    #[error("entity resolves to no location: {0}")]
    OrphanedEntity(String),
}

/// Errors raised while reading a data bundle from disk.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("data directory not found under: {0}")]
    MissingDataDir(String),
}

pub type Result<T> = std::result::Result<T, BuildError>;
