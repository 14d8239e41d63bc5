// crates/claudex-assembler/src/lib.rs
//! Context Assembler (§4.7, component C7): priority-ordered, token-budgeted
//! section builders with a search-reservation pass.
//!
//! Consumes value copies handed to it by the caller — this crate never
//! holds a store or sidecar handle, only `ContextSources`.

pub mod assemble;
pub mod sections;
pub mod sources;
pub mod time;
pub mod tokens;

pub use assemble::{assemble, AssembledContext};
pub use sections::SourceTag;
pub use sources::{ContextSources, PostCompactionContext, RequirementStatus, SearchHit};
