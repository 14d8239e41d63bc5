// crates/claudex-types/src/lib.rs
//! Shared data model for the claudex context-memory engine.
//!
//! Every type here is a plain value type: no I/O, no behavior beyond
//! construction helpers and `Display`/`Serialize`. The store, the pressure
//! engine, the assembler, and the sidecar client all exchange these types
//! by value.

pub mod hook_input;
pub mod observation;
pub mod pressure;
pub mod reasoning;
pub mod session;
pub mod sidecar_wire;

pub use hook_input::*;
pub use observation::*;
pub use pressure::*;
pub use reasoning::*;
pub use session::*;
pub use sidecar_wire::*;
