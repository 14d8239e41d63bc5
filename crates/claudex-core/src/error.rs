// crates/claudex-core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the Observation Extractor (C2) while normalizing a tool
/// call. A `Filtered` result is not an error — it is the handler's explicit
/// "drop this observation" decision (§4.2) and is represented as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed tool input for {tool}: {message}")]
    MalformedInput { tool: String, message: String },
}

/// Errors raised reading and parsing the transcript tail for decision/thread
/// detection (C10) or the GSD project-plan tree (C11).
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied reading {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON at line {line} in {path}: {message}")]
    MalformedJson {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("malformed markdown frontmatter in {path}: {message}")]
    MalformedMarkdown { path: PathBuf, message: String },
}

impl ParseFailure {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_io_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
        let err = ParseFailure::io("/tmp/x", io_err);
        assert!(matches!(err, ParseFailure::NotFound { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = ParseFailure::io("/tmp/x", io_err);
        assert!(matches!(err, ParseFailure::PermissionDenied { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "nope");
        let err = ParseFailure::io("/tmp/x", io_err);
        assert!(matches!(err, ParseFailure::Io { .. }));
    }
}
