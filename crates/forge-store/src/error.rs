use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("manifest (de)serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("row carried unrecognized {field}: {value:?}")]
    BadEnumValue { field: &'static str, value: String },
    #[error("no module build with id {0}")]
    ModuleNotFound(forge_domain::ModuleBuildId),
    #[error("no component build with id {0}")]
    ComponentNotFound(forge_domain::ComponentBuildId),
}
