//! Crate-level error types.

use std::fmt;
use std::io;

/// Errors produced by the haywire client.
#[derive(Debug)]
pub enum ClientError {
    /// A transport call was made before `connect` or after the connection
    /// was lost.
    NotConnected,
    /// One of the two channels could not be opened.
    ConnectFailed {
        /// `host:port` of the channel that failed.
        addr: String,
        /// Last connect error observed.
        source: io::Error,
    },
    /// A remote round trip failed (short read/write, negative
    /// acknowledgement, timeout).
    TransportCallFailed {
        /// Name of the transport call that failed.
        call: &'static str,
        /// Human-readable failure reason.
        reason: String,
    },
    /// The render server process is not running.
    ProcessNotStarted(String),
    /// The host view or camera cannot be expressed as a remote camera.
    InvalidCameraMode(String),
    /// Generic I/O failure.
    Io(io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// The render loop worker panicked.
    WorkerPanicked,
}

impl ClientError {
    /// Wrap an I/O error raised inside the named transport call.
    pub(crate) fn call(call: &'static str, e: &io::Error) -> Self {
        Self::TransportCallFailed {
            call,
            reason: e.to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected to render server"),
            Self::ConnectFailed { addr, source } => {
                write!(f, "failed to connect to {addr}: {source}")
            }
            Self::TransportCallFailed { call, reason } => {
                write!(f, "transport call '{call}' failed: {reason}")
            }
            Self::ProcessNotStarted(msg) => {
                write!(f, "render server process is not started: {msg}")
            }
            Self::InvalidCameraMode(msg) => {
                write!(f, "invalid camera mode: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::WorkerPanicked => write!(f, "render loop worker panicked"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectFailed { source, .. } => Some(source),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn connect_failure_exposes_source() {
        let err = ClientError::ConnectFailed {
            addr: "localhost:7000".to_owned(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(err.to_string().contains("localhost:7000"));
        assert!(err.source().is_some());
    }

    #[test]
    fn call_failure_names_the_call() {
        let err = ClientError::call(
            "pull_frame",
            &io::Error::from(io::ErrorKind::UnexpectedEof),
        );
        assert!(err.to_string().starts_with("transport call 'pull_frame'"));
        assert!(err.source().is_none());
    }
}
