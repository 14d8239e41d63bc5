// crates/claudex-orchestrator/src/util.rs
//! Small filesystem helpers shared by the checkpoint writer and the
//! Recovery Pass.

use std::path::Path;

/// A file's modification time as epoch milliseconds, or `None` if the file
/// is absent or the platform can't report mtime.
pub(crate) fn file_mtime_epoch_ms(path: &Path) -> Option<i64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let duration = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    Some(duration.as_millis() as i64)
}
