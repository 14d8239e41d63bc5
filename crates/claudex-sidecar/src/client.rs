// crates/claudex-sidecar/src/client.rs
//! TCP JSON transport to the hologram sidecar (§6 "Sidecar wire protocol").
//!
//! Newline-delimited JSON frames on loopback. Port is discovered from a
//! filesystem marker (a single integer, one line). One retry on a transient
//! transport error with a fixed 50ms backoff (§4.6, SPEC_FULL §C.3).

use claudex_types::{SidecarRequest, SidecarRequestKind, SidecarRequestPayload, SidecarResponse, SidecarResultPayload};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::warn;

const DEFAULT_TIMEOUT_MS: u64 = 2000;
const RETRY_BACKOFF_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("sidecar port marker not found at {0}")]
    NoPortMarker(PathBuf),

    #[error("sidecar port marker malformed: {0}")]
    MalformedPortMarker(String),

    #[error("connection to sidecar unreachable: {0}")]
    Unreachable(#[source] std::io::Error),

    #[error("sidecar query timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed sidecar response: {0}")]
    Protocol(String),

    #[error("sidecar reported error: {0}")]
    RemoteError(String),
}

impl SidecarError {
    /// Whether this error is transient transport failure eligible for one
    /// retry (§4.6 "one retry on transient transport error").
    fn is_transient(&self) -> bool {
        matches!(self, SidecarError::Unreachable(e) if matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::TimedOut | std::io::ErrorKind::BrokenPipe
        ))
    }
}

/// A TCP JSON client for the hologram sidecar, with retry/backoff/timeout
/// baked in.
pub struct SidecarClient {
    port_marker: PathBuf,
    timeout: Duration,
}

impl SidecarClient {
    pub fn new(port_marker: impl Into<PathBuf>) -> Self {
        Self {
            port_marker: port_marker.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the port marker file (§6): a single integer, one line.
    async fn discover_port(&self) -> Result<u16, SidecarError> {
        let contents = tokio::fs::read_to_string(&self.port_marker)
            .await
            .map_err(|_| SidecarError::NoPortMarker(self.port_marker.clone()))?;
        contents
            .trim()
            .parse::<u16>()
            .map_err(|e| SidecarError::MalformedPortMarker(e.to_string()))
    }

    /// Send one request and await its correlated response, retrying once on
    /// a transient transport error (§4.6, SPEC_FULL §C.3).
    pub async fn query(
        &self,
        kind: SidecarRequestKind,
        payload: SidecarRequestPayload,
    ) -> Result<SidecarResultPayload, SidecarError> {
        let id = uuid::Uuid::new_v4().to_string();
        let request = SidecarRequest { id: id.clone(), kind, payload };

        match self.send_once(&request).await {
            Ok(payload) => Ok(payload),
            Err(e) if e.is_transient() => {
                tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS)).await;
                self.send_once(&request).await
            }
            Err(e) => Err(e),
        }
    }

    async fn send_once(&self, request: &SidecarRequest) -> Result<SidecarResultPayload, SidecarError> {
        let port = self.discover_port().await?;
        let result = tokio::time::timeout(self.timeout, self.round_trip(port, request)).await;

        match result {
            Ok(inner) => inner,
            Err(_elapsed) => Err(SidecarError::Timeout(self.timeout)),
        }
    }

    async fn round_trip(&self, port: u16, request: &SidecarRequest) -> Result<SidecarResultPayload, SidecarError> {
        let stream = TcpStream::connect(("127.0.0.1", port))
            .await
            .map_err(SidecarError::Unreachable)?;

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut line = serde_json::to_string(request).map_err(|e| SidecarError::Protocol(e.to_string()))?;
        line.push('\n');
        write_half.write_all(line.as_bytes()).await.map_err(SidecarError::Unreachable)?;

        let mut response_line = String::new();
        reader
            .read_line(&mut response_line)
            .await
            .map_err(SidecarError::Unreachable)?;
        if response_line.is_empty() {
            return Err(SidecarError::Unreachable(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "sidecar closed connection without replying",
            )));
        }

        let response: SidecarResponse =
            serde_json::from_str(response_line.trim()).map_err(|e| SidecarError::Protocol(e.to_string()))?;

        if response.id() != request.id {
            // A late reply for a different, already-abandoned request — the
            // caller's timeout already fired for that one; this one is
            // simply not what we asked for.
            return Err(SidecarError::Protocol(format!(
                "response id {} does not match request id {}",
                response.id(),
                request.id
            )));
        }

        match response {
            SidecarResponse::Result { payload, .. } => Ok(payload),
            SidecarResponse::Error { error, .. } => {
                warn!("sidecar returned error: {error}");
                Err(SidecarError::RemoteError(error))
            }
        }
    }
}

/// Whether a port marker at `path` is reachable, within a short timeout —
/// used by the Recovery Pass (§4.9 "Stale sidecar port file") to decide
/// whether to delete a stale marker.
pub async fn ping_port_marker(path: &Path, ping_timeout: Duration) -> bool {
    let Ok(contents) = tokio::fs::read_to_string(path).await else {
        return false;
    };
    let Ok(port) = contents.trim().parse::<u16>() else {
        return false;
    };
    tokio::time::timeout(ping_timeout, TcpStream::connect(("127.0.0.1", port)))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_port_marker_is_no_port_marker_error() {
        let client = SidecarClient::new("/tmp/claudex-sidecar-test-does-not-exist/port");
        let err = client
            .query(
                SidecarRequestKind::Query,
                SidecarRequestPayload {
                    prompt: None,
                    session: "s1".to_string(),
                    recent_files: vec![],
                    boost_files: vec![],
                    project: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SidecarError::NoPortMarker(_)));
    }

    #[tokio::test]
    async fn malformed_port_marker_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("port");
        tokio::fs::write(&marker, "not-a-port\n").await.unwrap();
        let client = SidecarClient::new(&marker);
        let err = client
            .query(
                SidecarRequestKind::Query,
                SidecarRequestPayload {
                    prompt: None,
                    session: "s1".to_string(),
                    recent_files: vec![],
                    boost_files: vec![],
                    project: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SidecarError::MalformedPortMarker(_)));
    }

    #[tokio::test]
    async fn unreachable_port_is_connection_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("port");
        // Port 1 is privileged/unassigned in test sandboxes; a closed, high,
        // unused port is more reliable for a refused-connection test.
        tokio::fs::write(&marker, "59999\n").await.unwrap();
        let client = SidecarClient::new(&marker).with_timeout(Duration::from_millis(500));
        let err = client
            .query(
                SidecarRequestKind::Query,
                SidecarRequestPayload {
                    prompt: None,
                    session: "s1".to_string(),
                    recent_files: vec![],
                    boost_files: vec![],
                    project: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SidecarError::Unreachable(_) | SidecarError::Timeout(_)));
    }

    #[tokio::test]
    async fn ping_port_marker_false_when_missing() {
        let reachable = ping_port_marker(Path::new("/tmp/claudex-no-such-marker"), Duration::from_millis(200)).await;
        assert!(!reachable);
    }
}
