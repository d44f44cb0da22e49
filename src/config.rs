use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHUNK_SIZE: usize = 1024;
const DEFAULT_STOP_GRACE_SECS: u64 = 3;
const DEFAULT_MAX_FRAME_BYTES: usize = 5 * 1024 * 1024;

/// Tuning knobs for the acquisition pipeline.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Timeout for opening the HTTP connection to a stream endpoint. There is
    /// no per-chunk read timeout once the stream is open; a dry spell is not
    /// an error.
    pub connect_timeout: Duration,
    /// Bytes requested per read from the open connection.
    pub chunk_size: usize,
    /// How long `stop()` waits for the worker thread before detaching it.
    pub stop_grace: Duration,
    /// Upper bound on a single JPEG payload. The accumulator sheds its oldest
    /// bytes once it holds twice this much without finding an end marker.
    pub max_frame_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            chunk_size: DEFAULT_CHUNK_SIZE,
            stop_grace: Duration::from_secs(DEFAULT_STOP_GRACE_SECS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
