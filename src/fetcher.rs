//! Background MJPEG acquisition worker.
//!
//! One fetcher owns one open connection to one camera's stream. The connect
//! phase runs on the caller's thread so connection and endpoint failures are
//! returned from `start`; everything after - chunk reads, frame extraction,
//! JPEG decode, emission - happens on a dedicated worker thread and never
//! blocks the caller.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::StreamConfig;
use crate::endpoint::StreamEndpoint;
use crate::error::{StreamError, StreamErrorEvent};
use crate::frame::{DecodedFrame, FrameSlot};
use crate::mjpeg::FrameAccumulator;
use crate::transport::Connector;

/// Produces a lazy, unbounded sequence of decoded frames from one endpoint
/// until cancelled or the connection ends.
pub struct StreamFetcher;

impl StreamFetcher {
    /// Open `endpoint` and start the read loop on a worker thread.
    ///
    /// Fails with `Connect` when the socket cannot be opened and `Endpoint`
    /// when the server answers with a non-success status. On success the
    /// worker publishes decoded frames into `frames` and at most one terminal
    /// error event into `errors`.
    pub fn start(
        endpoint: StreamEndpoint,
        connector: &dyn Connector,
        config: &StreamConfig,
        frames: Arc<FrameSlot>,
        errors: mpsc::Sender<StreamErrorEvent>,
    ) -> Result<FetcherHandle, StreamError> {
        let reader = connector.open(&endpoint)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            endpoint: endpoint.clone(),
            reader,
            accumulator: FrameAccumulator::new(config.max_frame_bytes),
            chunk_size: config.chunk_size.max(1),
            cancel: cancel.clone(),
            frames,
            errors,
        };
        let join = std::thread::spawn(move || worker.run());
        Ok(FetcherHandle {
            endpoint,
            cancel,
            join: Some(join),
            stop_grace: config.stop_grace,
        })
    }
}

/// Control handle for a running fetcher.
pub struct FetcherHandle {
    endpoint: StreamEndpoint,
    cancel: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    stop_grace: Duration,
}

impl FetcherHandle {
    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// True once the worker thread has exited, cleanly or not.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    /// Request cancellation and wait up to the stop grace period.
    ///
    /// Idempotent; stopping an already-finished fetcher is a no-op. A worker
    /// still blocked in a read when the grace period runs out is detached: it
    /// observes cancellation on its next read return and exits without
    /// emitting anything further.
    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        let Some(join) = self.join.take() else {
            return;
        };
        let deadline = Instant::now() + self.stop_grace;
        while !join.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        if join.is_finished() {
            if join.join().is_err() {
                log::error!(
                    "stream worker for camera {} panicked",
                    self.endpoint.camera_id()
                );
            }
        } else {
            log::warn!(
                "stream worker for camera {} still blocked after {:?}, detaching",
                self.endpoint.camera_id(),
                self.stop_grace
            );
        }
    }
}

impl Drop for FetcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    endpoint: StreamEndpoint,
    reader: Box<dyn Read + Send>,
    accumulator: FrameAccumulator,
    chunk_size: usize,
    cancel: Arc<AtomicBool>,
    frames: Arc<FrameSlot>,
    errors: mpsc::Sender<StreamErrorEvent>,
}

impl Worker {
    fn run(mut self) {
        log::info!(
            "streaming camera {} from {}",
            self.endpoint.camera_id(),
            self.endpoint.url()
        );
        let mut chunk = vec![0u8; self.chunk_size];
        'read: loop {
            if self.cancelled() {
                break;
            }
            let read = match self.reader.read(&mut chunk) {
                Ok(0) => {
                    log::info!("stream for camera {} ended", self.endpoint.camera_id());
                    break;
                }
                Ok(read) => read,
                Err(err) => {
                    // A read failing because stop() raced the close is not an
                    // error worth surfacing.
                    if self.cancelled() {
                        break;
                    }
                    let event = StreamErrorEvent::from(&StreamError::Transport(err));
                    let _ = self.errors.send(event);
                    break;
                }
            };
            if self.cancelled() {
                break;
            }
            self.accumulator.extend(&chunk[..read]);
            // Drain every complete frame already buffered so a fast producer
            // cannot grow the accumulator while the consumer lags.
            while let Some(payload) = self.accumulator.next_payload() {
                if self.cancelled() {
                    break 'read;
                }
                match decode_jpeg(&payload) {
                    Ok(frame) => self.frames.publish(frame),
                    Err(err) => log::debug!(
                        "dropping undecodable {}-byte frame from camera {}: {}",
                        payload.len(),
                        self.endpoint.camera_id(),
                        err
                    ),
                }
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

fn decode_jpeg(bytes: &[u8]) -> Result<DecodedFrame, StreamError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| StreamError::Decode(e.to_string()))?;
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(DecodedFrame::new(width, height, rgb.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Replays one byte buffer, at most `chunk` bytes per read.
    pub(crate) struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl ChunkedReader {
        pub(crate) fn new(data: Vec<u8>, chunk: usize) -> Self {
            Self {
                data,
                pos: 0,
                chunk,
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let remaining = self.data.len() - self.pos;
            let len = remaining.min(self.chunk).min(buf.len());
            buf[..len].copy_from_slice(&self.data[self.pos..self.pos + len]);
            self.pos += len;
            Ok(len)
        }
    }

    struct ChunkedConnector {
        data: Vec<u8>,
        chunk: usize,
    }

    impl Connector for ChunkedConnector {
        fn open(&self, _endpoint: &StreamEndpoint) -> Result<Box<dyn Read + Send>, StreamError> {
            Ok(Box::new(ChunkedReader::new(self.data.clone(), self.chunk)))
        }
    }

    struct FailingConnector;

    impl Connector for FailingConnector {
        fn open(&self, _endpoint: &StreamEndpoint) -> Result<Box<dyn Read + Send>, StreamError> {
            Err(StreamError::Endpoint { status: 502 })
        }
    }

    fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .expect("encode jpeg fixture");
        out.into_inner()
    }

    fn wait_until_finished(handle: &FetcherHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_finished(), "worker did not finish in time");
    }

    #[test]
    fn start_surfaces_endpoint_errors_synchronously() {
        let (tx, rx) = mpsc::channel();
        let result = StreamFetcher::start(
            StreamEndpoint::new("http://example/video/0", 0),
            &FailingConnector,
            &StreamConfig::default(),
            Arc::new(FrameSlot::new()),
            tx,
        );
        match result {
            Err(StreamError::Endpoint { status }) => assert_eq!(status, 502),
            other => panic!("expected endpoint error, got {:?}", other.map(|_| ())),
        }
        // No worker was spawned, so no error event either.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn frames_are_decoded_across_arbitrary_chunking() -> anyhow::Result<()> {
        let jpeg = jpeg_fixture(48, 32);
        let mut stream = b"leading garbage".to_vec();
        stream.extend_from_slice(&jpeg);
        stream.extend_from_slice(&jpeg);

        for chunk in [1usize, 7, 1024, 100_000] {
            let frames = Arc::new(FrameSlot::new());
            let (tx, rx) = mpsc::channel();
            let connector = ChunkedConnector {
                data: stream.clone(),
                chunk,
            };
            let mut handle = StreamFetcher::start(
                StreamEndpoint::new("http://example/video/0", 0),
                &connector,
                &StreamConfig::default(),
                frames.clone(),
                tx,
            )?;
            wait_until_finished(&handle);
            handle.stop();

            assert_eq!(frames.frames_published(), 2, "chunk size {}", chunk);
            let frame = frames.try_recv().expect("latest frame");
            assert_eq!((frame.width, frame.height), (48, 32));
            assert!(rx.try_recv().is_err(), "graceful end emits no error");
        }
        Ok(())
    }

    #[test]
    fn corrupt_payload_is_dropped_without_killing_the_stream() -> anyhow::Result<()> {
        let good = jpeg_fixture(32, 24);
        let mut corrupt = vec![0xFF, 0xD8];
        corrupt.extend_from_slice(b"not a jpeg body");
        corrupt.extend_from_slice(&[0xFF, 0xD9]);

        let mut stream = good.clone();
        stream.extend_from_slice(&corrupt);
        stream.extend_from_slice(&good);

        let frames = Arc::new(FrameSlot::new());
        let (tx, rx) = mpsc::channel();
        let connector = ChunkedConnector {
            data: stream,
            chunk: 1024,
        };
        let mut handle = StreamFetcher::start(
            StreamEndpoint::new("http://example/video/0", 0),
            &connector,
            &StreamConfig::default(),
            frames.clone(),
            tx,
        )?;
        wait_until_finished(&handle);
        handle.stop();

        assert_eq!(frames.frames_published(), 2);
        assert!(rx.try_recv().is_err(), "decode failures are not error events");
        Ok(())
    }

    #[test]
    fn transport_error_is_surfaced_once() -> anyhow::Result<()> {
        struct BrokenReader;
        impl Read for BrokenReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
            }
        }
        struct BrokenConnector;
        impl Connector for BrokenConnector {
            fn open(
                &self,
                _endpoint: &StreamEndpoint,
            ) -> Result<Box<dyn Read + Send>, StreamError> {
                Ok(Box::new(BrokenReader))
            }
        }

        let frames = Arc::new(FrameSlot::new());
        let (tx, rx) = mpsc::channel();
        let mut handle = StreamFetcher::start(
            StreamEndpoint::new("http://example/video/0", 0),
            &BrokenConnector,
            &StreamConfig::default(),
            frames.clone(),
            tx,
        )?;
        wait_until_finished(&handle);
        handle.stop();

        let event = rx.recv_timeout(Duration::from_secs(1))?;
        assert_eq!(event.kind, crate::error::StreamErrorKind::Transport);
        assert!(rx.try_recv().is_err(), "exactly one terminal error event");
        assert_eq!(frames.frames_published(), 0);
        Ok(())
    }

    #[test]
    fn stop_is_idempotent() -> anyhow::Result<()> {
        let connector = ChunkedConnector {
            data: Vec::new(),
            chunk: 1024,
        };
        let (tx, _rx) = mpsc::channel();
        let mut handle = StreamFetcher::start(
            StreamEndpoint::new("http://example/video/0", 0),
            &connector,
            &StreamConfig::default(),
            Arc::new(FrameSlot::new()),
            tx,
        )?;
        handle.stop();
        handle.stop();
        assert!(handle.is_finished());
        Ok(())
    }
}
