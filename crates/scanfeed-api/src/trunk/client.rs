// Trunk Recorder HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, status checking and
// JSON decoding. Endpoint methods live in `calls.rs` and `systems.rs`.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw audio bytes plus the metadata needed to serve them.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub data: Bytes,
    /// MIME type reported by the server (`audio/mpeg` when absent).
    pub content_type: String,
}

/// HTTP client for a Trunk Recorder instance.
///
/// All paths are resolved against `base_url`, e.g. `http://scanner:3000/`.
pub struct TrunkClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl TrunkClient {
    /// Create a client from a base URL and transport settings.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Create a client for `http://{host}:{port}/`.
    pub fn from_host_port(host: &str, port: u16, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("http://{host}:{port}/"))?;
        Self::new(base_url, transport)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            timeout_secs: 0,
        }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Resolve `api/{path}` against the base URL.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/{path}"))?)
    }

    /// Append `api` and each segment to the base path, percent-encoding
    /// any `/`, `?` or `#` inside a segment.
    pub(crate) fn api_segments_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// The push channel endpoint (`ws://host:port/ws`, `wss` for https bases).
    pub fn websocket_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join("ws")?;
        let scheme = if self.base_url.scheme() == "https" { "wss" } else { "ws" };
        // Only fails for cannot-be-a-base URLs, which `join` never yields here.
        let _ = url.set_scheme(scheme);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.send(url).await?;
        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Send a GET request for a JSON array and decode each element on its
    /// own. Elements that fail to decode are logged and skipped.
    pub(crate) async fn get_json_list<T: DeserializeOwned>(
        &self,
        url: Url,
        kind: &'static str,
    ) -> Result<Vec<T>, Error> {
        let values: Vec<serde_json::Value> = self.get_json(url).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(kind, error = %e, "skipping undecodable list element");
                    None
                }
            })
            .collect())
    }

    /// Send a GET request and return the raw body, or `None` on 404.
    pub(crate) async fn get_bytes(&self, url: Url) -> Result<Option<AudioPayload>, Error> {
        debug!("GET {}", url);

        let resp = match self.send(url).await {
            Ok(resp) => resp,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_owned();
        let data = resp.bytes().await.map_err(|e| self.map_transport(e))?;

        Ok(Some(AudioPayload { data, content_type }))
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response, Error> {
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}

/// Ensure the base URL ends with `/` so `join` appends instead of replacing.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
