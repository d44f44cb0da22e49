//! DetectorCam stream core.
//!
//! Client-side acquisition pipeline for remote MJPEG camera feeds. The
//! surrounding application (UI, auth, rendering) is an external collaborator:
//! it calls activate / switch / deactivate and consumes decoded frames and
//! error events; everything between the HTTP socket and that handoff lives
//! here.
//!
//! # Architecture
//!
//! - `StreamFetcher`: one long-lived HTTP connection to one camera's
//!   multipart/JPEG endpoint. A dedicated worker thread reads chunks,
//!   reassembles JPEG frame boundaries from the undelimited byte stream,
//!   decodes each payload and publishes frames at whatever rate they arrive.
//! - `StreamSession`: lifecycle manager. Tracks the active camera, replaces
//!   the fetcher on switch (old one fully stopped first, never two alive),
//!   and exposes the subscription surface.
//!
//! Frames ride a capacity-1 latest-value slot: a slow consumer sees the
//! newest frame and never stalls the worker. The pipeline does not retry a
//! failed stream; that policy belongs to the caller.
//!
//! # Module Structure
//!
//! - `mjpeg`: JPEG frame boundary extraction (`FrameAccumulator`)
//! - `fetcher`: background acquisition worker (`StreamFetcher`)
//! - `session`: lifecycle + subscription (`StreamSession`, `StreamState`)
//! - `transport`: connector seam and camera server control client
//! - `endpoint`, `frame`, `error`, `config`: supporting types

pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetcher;
pub mod frame;
pub mod mjpeg;
pub mod session;
pub mod transport;

pub use config::StreamConfig;
pub use endpoint::{ServerAddress, StreamEndpoint};
pub use error::{StreamError, StreamErrorEvent, StreamErrorKind};
pub use fetcher::{FetcherHandle, StreamFetcher};
pub use frame::{DecodedFrame, FrameSlot};
pub use mjpeg::FrameAccumulator;
pub use session::{StreamSession, StreamState, StreamSubscriber};
pub use transport::{CameraList, CameraServerClient, Connector, HttpConnector};
