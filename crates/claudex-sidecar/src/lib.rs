// crates/claudex-sidecar/src/lib.rs
//! Sidecar Client + Resilient Query (§4.6, component C6): a TCP JSON client
//! for the external hologram scoring service, and the tiered fallback query
//! that degrades to persisted pressure, then recency, when it's unreachable.
//!
//! This crate never touches the store directly — `claudex-db` depends on
//! nothing here, so the dependency only runs the other way. The resilient
//! query takes the store's pressure read as an injected future, which keeps
//! the tiered-fallback logic testable without a real database.

pub mod client;
pub mod resilient;

pub use client::{SidecarClient, SidecarError};
pub use resilient::{query_with_fallback, resolve_boost_files, ResilientQueryRequest};
