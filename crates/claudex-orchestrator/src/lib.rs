// crates/claudex-orchestrator/src/lib.rs
//! Flush/Checkpoint Orchestrator (§4.8, component C8) and Recovery Pass
//! (§4.9, component C9): the stateful machinery that the pre_compact and
//! session_start hooks drive.
//!
//! `execute_flush` does not gate on the cooldown itself — the caller checks
//! `FlushCooldown::is_active` first, since only the caller knows which
//! event triggered the flush attempt and whether it's worth paying for the
//! check at all.

pub mod checkpoint;
pub mod cooldown;
pub mod error;
pub mod flush;
pub mod mirrors;
pub mod recovery;
mod util;

pub use checkpoint::{Checkpoint, CheckpointFiles, CheckpointGsd, CheckpointMeta, CheckpointThread, KeyExchange};
pub use cooldown::FlushCooldown;
pub use error::OrchestratorError;
pub use flush::{execute_flush, FlushInput, FlushOutcome};
pub use recovery::{run_recovery, RecoveryCheck, RecoveryReport, RecoveryStatus};
