// crates/claudex-db/src/queries/mod.rs
//! Typed CRUD surface over the claudex store (§4.3), grouped by entity.

pub mod audit;
pub mod checkpoint;
pub mod consensus;
pub mod integrity;
pub mod observations;
pub mod pressure;
pub mod reasoning;
pub mod sessions;

pub(crate) fn to_json_array(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn from_json_array(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_default()
}
