// crates/claudex-orchestrator/src/cooldown.rs
//! Flush-cooldown bookkeeping (§4.8, §5 "Locking discipline"): an in-process
//! timestamp for the calling process, mirrored to a filesystem marker for
//! cross-process coordination. Neither half is a mutex — both are
//! last-writer-wins timestamps, which the 30-60s debounce windows make safe
//! since flushes are idempotent under repetition.

use std::path::{Path, PathBuf};
use tracing::warn;

/// Read the marker file's epoch-ms value, tolerating absence or corruption.
/// Used both by `FlushCooldown` and by the Recovery Pass's stale-marker
/// check (§4.9 step 3), which needs the raw value to judge staleness.
pub fn read_marker(path: &Path) -> Option<i64> {
    std::fs::read_to_string(path).ok()?.trim().parse::<i64>().ok()
}

pub struct FlushCooldown {
    marker_path: PathBuf,
    last_flush_epoch: Option<i64>,
}

impl FlushCooldown {
    /// Load the in-process timestamp from whatever the filesystem marker
    /// currently holds, so a freshly-started process inherits another
    /// process's recent flush.
    pub fn load(marker_path: impl Into<PathBuf>) -> Self {
        let marker_path = marker_path.into();
        let last_flush_epoch = read_marker(&marker_path);
        Self { marker_path, last_flush_epoch }
    }

    /// `isCooldownActive(ms) ≡ now − lastFlushEpoch < ms` (§4.8).
    pub fn is_active(&self, now_epoch_ms: i64, window_ms: i64) -> bool {
        self.last_flush_epoch.map(|t| now_epoch_ms - t < window_ms).unwrap_or(false)
    }

    /// Set `lastFlushEpoch := now` in-process and mirror it to the
    /// filesystem marker (§4.8 step 5).
    pub fn mark_flushed(&mut self, now_epoch_ms: i64) {
        self.last_flush_epoch = Some(now_epoch_ms);
        if let Some(parent) = self.marker_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("flush cooldown marker directory creation failed: {e}");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.marker_path, now_epoch_ms.to_string()) {
            warn!("flush cooldown marker write failed: {e}");
        }
    }

    /// `resetCooldown` (§8): clear both the in-process timestamp and the
    /// filesystem marker.
    pub fn reset(&mut self) {
        self.last_flush_epoch = None;
        let _ = std::fs::remove_file(&self.marker_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_before_any_flush() {
        let tmp = tempfile::tempdir().unwrap();
        let cooldown = FlushCooldown::load(tmp.path().join(".flush_cooldown"));
        assert!(!cooldown.is_active(1000, 30_000));
    }

    #[test]
    fn active_immediately_after_flush_then_expires() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cooldown = FlushCooldown::load(tmp.path().join(".flush_cooldown"));
        cooldown.mark_flushed(1000);
        assert!(cooldown.is_active(1000 + 29_999, 30_000));
        assert!(!cooldown.is_active(1000 + 30_000, 30_000));
    }

    #[test]
    fn reset_clears_cooldown_and_marker_file() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".flush_cooldown");
        let mut cooldown = FlushCooldown::load(&marker);
        cooldown.mark_flushed(1000);
        assert!(marker.exists());
        cooldown.reset();
        assert!(!cooldown.is_active(1000, 30_000));
        assert!(!marker.exists());
    }

    #[test]
    fn a_fresh_process_inherits_another_processs_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(".flush_cooldown");
        let mut writer = FlushCooldown::load(&marker);
        writer.mark_flushed(5000);

        let reader = FlushCooldown::load(&marker);
        assert!(reader.is_active(5000 + 100, 30_000));
    }
}
