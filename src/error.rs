//! Stream error taxonomy.
//!
//! Connect, endpoint and transport errors terminate the fetcher they belong to
//! and are surfaced once on the subscriber's error channel. Decode errors never
//! leave the fetcher: a corrupt frame is dropped and the loop continues.

use std::io;
use thiserror::Error;

/// Machine-readable error class carried alongside the display reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamErrorKind {
    Connect,
    Endpoint,
    Transport,
    Decode,
    NoCamera,
}

/// Errors produced by the acquisition pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The socket or handshake to the stream endpoint could not be opened.
    #[error("cannot open stream endpoint: {0}")]
    Connect(String),

    /// The server answered the stream request with a non-success status.
    #[error("stream endpoint returned HTTP {status}")]
    Endpoint { status: u16 },

    /// The connection failed mid-stream. The fetcher ends after surfacing this.
    #[error("stream read failed: {0}")]
    Transport(#[from] io::Error),

    /// One extracted payload was not a decodable JPEG. Non-fatal: the frame is
    /// dropped and the stream continues.
    #[error("frame decode failed: {0}")]
    Decode(String),

    /// Activation was requested with an empty camera list.
    #[error("no cameras available")]
    NoCamera,
}

impl StreamError {
    pub fn kind(&self) -> StreamErrorKind {
        match self {
            StreamError::Connect(_) => StreamErrorKind::Connect,
            StreamError::Endpoint { .. } => StreamErrorKind::Endpoint,
            StreamError::Transport(_) => StreamErrorKind::Transport,
            StreamError::Decode(_) => StreamErrorKind::Decode,
            StreamError::NoCamera => StreamErrorKind::NoCamera,
        }
    }
}

/// Error event as delivered on the subscriber channel: a kind for dispatch and
/// a human-readable reason for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamErrorEvent {
    pub kind: StreamErrorKind,
    pub reason: String,
}

impl From<&StreamError> for StreamErrorEvent {
    fn from(err: &StreamError) -> Self {
        Self {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_carries_kind_and_reason() {
        let err = StreamError::Endpoint { status: 503 };
        let event = StreamErrorEvent::from(&err);
        assert_eq!(event.kind, StreamErrorKind::Endpoint);
        assert!(event.reason.contains("503"));
    }

    #[test]
    fn io_errors_map_to_transport() {
        let err: StreamError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert_eq!(err.kind(), StreamErrorKind::Transport);
    }
}
