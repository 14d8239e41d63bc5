// crates/claudex-observability/src/lib.rs
//! Ambient logging setup for the claudex hook binaries (SPEC_FULL §B).
//!
//! Every `claudex-hooks` binary calls [`init`] once, before touching stdin,
//! so that every caught error downstream has somewhere to go. Hooks never
//! print to stdout except their final JSON output (§6) and never to stderr
//! either — both streams are reserved for the host, so all logging goes to
//! a per-hook rolling file under `~/.claudex/hooks/logs/`.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Returned by [`init`] — holding this alive keeps the non-blocking file
/// writer's background flush thread running. Drop it only at process exit.
pub struct LogGuard {
    _appender_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize a `tracing` subscriber writing to
/// `~/.claudex/hooks/logs/<hook_name>.log`, daily-rotated, non-blocking.
///
/// Filter defaults to `warn` and honors `CLAUDEX_LOG` when set (e.g.
/// `CLAUDEX_LOG=debug`). Failure to create the logs directory degrades to
/// a no-op subscriber rather than aborting the hook — a hook binary must
/// never fail to start just because logging isn't available (§7).
pub fn init(hook_name: &str) -> LogGuard {
    let filter = EnvFilter::try_from_env("CLAUDEX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    match logs_dir() {
        Some(dir) => match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, format!("{hook_name}.log"));
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let subscriber = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .finish();
                if tracing::subscriber::set_global_default(subscriber).is_err() {
                    // Already initialized (e.g. a second `init` call in tests) — not an error.
                }
                LogGuard { _appender_guard: Some(guard) }
            }
            Err(_) => LogGuard { _appender_guard: None },
        },
        None => LogGuard { _appender_guard: None },
    }
}

fn logs_dir() -> Option<PathBuf> {
    claudex_core::paths::hook_logs_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_without_home_dir() {
        std::env::set_var("CLAUDEX_HOME", "/tmp/claudex-observability-test-home");
        let _guard = init("test-hook");
        std::env::remove_var("CLAUDEX_HOME");
    }
}
