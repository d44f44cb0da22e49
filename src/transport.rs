//! Connection seam and remote camera server client.
//!
//! `Connector` is the byte-stream seam: the production implementation opens an
//! HTTP GET with ureq, tests replay canned bytes through the same trait.
//! `CameraServerClient` covers the server's control routes (activate, list,
//! deactivate); the stream itself always goes through a `Connector`.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use crate::config::StreamConfig;
use crate::endpoint::{ServerAddress, StreamEndpoint};
use crate::error::StreamError;

const ACTIVATE_TIMEOUT: Duration = Duration::from_secs(20);
const LIST_TIMEOUT: Duration = Duration::from_secs(5);
const DEACTIVATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens the raw byte stream behind an endpoint.
pub trait Connector: Send + Sync {
    fn open(&self, endpoint: &StreamEndpoint) -> Result<Box<dyn Read + Send>, StreamError>;
}

/// ureq-backed connector.
///
/// The connect phase is bounded by `StreamConfig::connect_timeout`; once the
/// stream is open there is no read timeout, so a slow camera is
/// indistinguishable from a dry spell and only `stop()` ends the wait.
pub struct HttpConnector {
    agent: ureq::Agent,
}

impl HttpConnector {
    pub fn new(config: &StreamConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .build();
        Self { agent }
    }
}

impl Connector for HttpConnector {
    fn open(&self, endpoint: &StreamEndpoint) -> Result<Box<dyn Read + Send>, StreamError> {
        let response = self
            .agent
            .get(endpoint.url())
            .call()
            .map_err(map_http_error)?;
        Ok(response.into_reader())
    }
}

/// JSON body of `GET {base}/listar-camaras`.
#[derive(Debug, Deserialize)]
pub struct CameraList {
    #[serde(default)]
    pub camaras: Vec<u32>,
    #[serde(default)]
    pub camara_activa: bool,
}

/// Control-plane client for the remote camera server.
pub struct CameraServerClient {
    base_url: String,
}

impl CameraServerClient {
    pub fn new(address: &ServerAddress) -> Self {
        Self {
            base_url: address.base_url(),
        }
    }

    /// Ask the server to power up its cameras.
    pub fn activate_cameras(&self) -> Result<(), StreamError> {
        let url = format!("{}/activar-camara", self.base_url);
        ureq::get(&url)
            .timeout(ACTIVATE_TIMEOUT)
            .call()
            .map_err(map_http_error)?;
        Ok(())
    }

    /// Fetch the camera inventory.
    pub fn list_cameras(&self) -> Result<CameraList, StreamError> {
        let url = format!("{}/listar-camaras", self.base_url);
        let response = ureq::get(&url)
            .timeout(LIST_TIMEOUT)
            .call()
            .map_err(map_http_error)?;
        let body = response.into_string().map_err(StreamError::Transport)?;
        serde_json::from_str(&body)
            .map_err(|e| StreamError::Connect(format!("invalid camera list response: {}", e)))
    }

    /// Tell the server streaming ended. Best effort: the caller decides
    /// whether a failure matters (the session swallows it).
    pub fn deactivate_cameras(&self) -> Result<(), StreamError> {
        let url = format!("{}/desactivar-camara", self.base_url);
        ureq::get(&url)
            .timeout(DEACTIVATE_TIMEOUT)
            .call()
            .map_err(map_http_error)?;
        Ok(())
    }
}

fn map_http_error(err: ureq::Error) -> StreamError {
    match err {
        ureq::Error::Status(status, _) => StreamError::Endpoint { status },
        ureq::Error::Transport(transport) => StreamError::Connect(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_list_parses_server_payload() -> anyhow::Result<()> {
        let list: CameraList = serde_json::from_str(r#"{"camaras":[0,1,2],"camara_activa":true}"#)?;
        assert_eq!(list.camaras, vec![0, 1, 2]);
        assert!(list.camara_activa);
        Ok(())
    }

    #[test]
    fn camera_list_defaults_missing_fields() -> anyhow::Result<()> {
        let list: CameraList = serde_json::from_str("{}")?;
        assert!(list.camaras.is_empty());
        assert!(!list.camara_activa);
        Ok(())
    }
}
