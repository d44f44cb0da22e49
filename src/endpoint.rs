//! Stream endpoint resolution.
//!
//! The auth service hands the client either a host/port pair or a public URL
//! for the camera server. Both resolve to the same endpoint shape here, so the
//! rest of the pipeline never cares which indirection was in play.

use url::Url;

use crate::error::StreamError;

/// Address of the remote camera server, as returned by the auth service.
#[derive(Clone, Debug)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    /// Public URL indirection. When present it wins over host/port.
    pub public_url: Option<String>,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            public_url: None,
        }
    }

    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// Base URL for every camera server route.
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }

    /// Resolve the MJPEG stream endpoint for one camera.
    pub fn video_endpoint(&self, camera_id: u32) -> Result<StreamEndpoint, StreamError> {
        let url = format!("{}/video/{}", self.base_url(), camera_id);
        Url::parse(&url)
            .map_err(|e| StreamError::Connect(format!("invalid stream url {}: {}", url, e)))?;
        Ok(StreamEndpoint { url, camera_id })
    }
}

/// One camera's MJPEG byte stream address.
///
/// Immutable once constructed; owned by a fetcher for its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEndpoint {
    url: String,
    camera_id: u32,
}

impl StreamEndpoint {
    pub fn new(url: impl Into<String>, camera_id: u32) -> Self {
        Self {
            url: url.into(),
            camera_id,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn camera_id(&self) -> u32 {
        self.camera_id
    }
}
