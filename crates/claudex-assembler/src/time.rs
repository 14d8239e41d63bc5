// crates/claudex-assembler/src/time.rs
//! Relative-time rendering for section bodies (§4.7 "Time formatting").
//! Epoch inputs are milliseconds.

/// `<60s → "just now"`, `<60m → "Xm ago"`, `<24h → "Xh ago"`, else `"Xd ago"`.
pub fn relative(now_epoch_ms: i64, then_epoch_ms: i64) -> String {
    let elapsed_ms = (now_epoch_ms - then_epoch_ms).max(0);
    let elapsed_s = elapsed_ms / 1000;

    if elapsed_s < 60 {
        "just now".to_string()
    } else if elapsed_s < 60 * 60 {
        format!("{}m ago", elapsed_s / 60)
    } else if elapsed_s < 24 * 60 * 60 {
        format!("{}h ago", elapsed_s / (60 * 60))
    } else {
        format!("{}d ago", elapsed_s / (24 * 60 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_match_spec_boundaries() {
        let now = 1_000_000_000i64;
        assert_eq!(relative(now, now), "just now");
        assert_eq!(relative(now, now - 59_000), "just now");
        assert_eq!(relative(now, now - 60_000), "1m ago");
        assert_eq!(relative(now, now - 59 * 60_000), "59m ago");
        assert_eq!(relative(now, now - 60 * 60_000), "1h ago");
        assert_eq!(relative(now, now - 23 * 60 * 60_000), "23h ago");
        assert_eq!(relative(now, now - 24 * 60 * 60_000), "1d ago");
        assert_eq!(relative(now, now - 3 * 24 * 60 * 60_000), "3d ago");
    }

    #[test]
    fn future_timestamps_clamp_to_just_now() {
        let now = 1_000_000_000i64;
        assert_eq!(relative(now, now + 10_000), "just now");
    }
}
