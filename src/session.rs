//! Stream lifecycle management.
//!
//! The session sequences fetcher lifecycles against user intent - activate,
//! switch camera, deactivate - and presents one stable subscription surface no
//! matter how many fetchers come and go underneath it. At most one fetcher is
//! ever alive: a replacement always stops the old worker synchronously before
//! the new one starts, and the frame slot is cleared in between, so frames
//! from two streams can never interleave.

use std::sync::{mpsc, Arc};

use crate::config::StreamConfig;
use crate::endpoint::ServerAddress;
use crate::error::{StreamError, StreamErrorEvent};
use crate::fetcher::{FetcherHandle, StreamFetcher};
use crate::frame::{DecodedFrame, FrameSlot};
use crate::transport::{CameraServerClient, Connector, HttpConnector};

/// Where the session currently is in a fetcher's lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Stopping,
    Failed(String),
}

/// Subscription surface handed to the consumer: one channel for frames, one
/// for error events, multiplexed from whichever fetcher is currently active.
pub struct StreamSubscriber {
    frames: Arc<FrameSlot>,
    errors: mpsc::Receiver<StreamErrorEvent>,
}

impl StreamSubscriber {
    /// Latest-value frame slot. See `FrameSlot` for delivery semantics.
    pub fn frames(&self) -> &FrameSlot {
        &self.frames
    }

    /// Take the latest frame if one is waiting.
    pub fn try_frame(&self) -> Option<DecodedFrame> {
        self.frames.try_recv()
    }

    /// Next error event, if one is waiting.
    pub fn try_error(&self) -> Option<StreamErrorEvent> {
        self.errors.try_recv().ok()
    }

    pub fn errors(&self) -> &mpsc::Receiver<StreamErrorEvent> {
        &self.errors
    }
}

/// Lifecycle manager for streaming from a remote camera server.
pub struct StreamSession {
    address: ServerAddress,
    config: StreamConfig,
    connector: Box<dyn Connector>,
    cameras: Vec<u32>,
    current_index: usize,
    state: StreamState,
    fetcher: Option<FetcherHandle>,
    frames: Arc<FrameSlot>,
    errors: mpsc::Sender<StreamErrorEvent>,
}

impl StreamSession {
    /// Session speaking HTTP to `address`.
    pub fn new(address: ServerAddress, config: StreamConfig) -> (Self, StreamSubscriber) {
        let connector = Box::new(HttpConnector::new(&config));
        Self::with_connector(address, config, connector)
    }

    /// Transport seam for tests and alternative byte sources.
    pub fn with_connector(
        address: ServerAddress,
        config: StreamConfig,
        connector: Box<dyn Connector>,
    ) -> (Self, StreamSubscriber) {
        let frames = Arc::new(FrameSlot::new());
        let (tx, rx) = mpsc::channel();
        let session = Self {
            address,
            config,
            connector,
            cameras: Vec::new(),
            current_index: 0,
            state: StreamState::Idle,
            fetcher: None,
            frames: frames.clone(),
            errors: tx,
        };
        let subscriber = StreamSubscriber { frames, errors: rx };
        (session, subscriber)
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn cameras(&self) -> &[u32] {
        &self.cameras
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Start streaming `cameras[index]`.
    ///
    /// Fails with `NoCamera` when the list is empty; no fetcher is started.
    /// Start failures move the session to `Failed` and are also delivered as
    /// an error event so a subscriber without the `Result` still learns why
    /// the stream never came up.
    pub fn activate(&mut self, cameras: &[u32], index: usize) -> Result<(), StreamError> {
        if cameras.is_empty() {
            return Err(StreamError::NoCamera);
        }
        self.cameras = cameras.to_vec();
        self.current_index = index % cameras.len();
        self.start_current()
    }

    /// Switch to `cameras[new_index mod len]`.
    ///
    /// No-op when the index is unchanged or there is at most one camera. The
    /// old fetcher is stopped synchronously before the new one starts.
    pub fn switch_camera(&mut self, new_index: usize) -> Result<(), StreamError> {
        if self.cameras.len() <= 1 {
            return Ok(());
        }
        let new_index = new_index % self.cameras.len();
        if new_index == self.current_index {
            return Ok(());
        }
        self.current_index = new_index;
        self.start_current()
    }

    /// Switch to the next camera, wrapping past the end of the list.
    pub fn next_camera(&mut self) -> Result<(), StreamError> {
        if self.cameras.len() <= 1 {
            return Ok(());
        }
        self.switch_camera((self.current_index + 1) % self.cameras.len())
    }

    /// Switch to the previous camera, wrapping past the start of the list.
    pub fn previous_camera(&mut self) -> Result<(), StreamError> {
        if self.cameras.len() <= 1 {
            return Ok(());
        }
        self.switch_camera((self.current_index + self.cameras.len() - 1) % self.cameras.len())
    }

    /// Stop streaming and notify the server out of band.
    ///
    /// Local teardown always succeeds; the deactivation notice is
    /// fire-and-forget and its failure never reaches the caller.
    pub fn deactivate(&mut self) {
        self.stop_fetcher();
        self.state = StreamState::Idle;
        self.notify_deactivated();
    }

    fn start_current(&mut self) -> Result<(), StreamError> {
        self.stop_fetcher();
        self.state = StreamState::Connecting;
        let camera_id = self.cameras[self.current_index];
        let endpoint = self.address.video_endpoint(camera_id).map_err(|err| {
            self.fail(&err);
            err
        })?;
        match StreamFetcher::start(
            endpoint,
            self.connector.as_ref(),
            &self.config,
            self.frames.clone(),
            self.errors.clone(),
        ) {
            Ok(handle) => {
                self.fetcher = Some(handle);
                self.state = StreamState::Streaming;
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Stop the active fetcher, if any, and drop whatever it left in the
    /// slot. The stop is a synchronous wait, not fire-and-forget: the next
    /// fetcher must not start until this one is gone.
    fn stop_fetcher(&mut self) {
        if let Some(mut fetcher) = self.fetcher.take() {
            self.state = StreamState::Stopping;
            fetcher.stop();
        }
        self.frames.clear();
    }

    fn fail(&mut self, err: &StreamError) {
        self.state = StreamState::Failed(err.to_string());
        let _ = self.errors.send(StreamErrorEvent::from(err));
    }

    fn notify_deactivated(&self) {
        let client = CameraServerClient::new(&self.address);
        std::thread::spawn(move || {
            if let Err(err) = client.deactivate_cameras() {
                log::debug!("camera deactivation notice failed: {}", err);
            }
        });
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop_fetcher();
    }
}
