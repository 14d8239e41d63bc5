// crates/claudex-orchestrator/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the Flush/Checkpoint Orchestrator (§4.8, C8). None of
/// these cross a hook boundary — `executeFlush` swallows subsystem failures
/// into its own result counters (§4.8 "A subsystem failure never aborts the
/// others").
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to write checkpoint file {path}: {source}")]
    CheckpointWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize checkpoint to YAML: {0}")]
    CheckpointSerialize(#[from] serde_yaml::Error),

    #[error("failed to write mirror file {path}: {source}")]
    MirrorWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
