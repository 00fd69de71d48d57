// Shared transport configuration for building reqwest::Client instances.
//
// The Trunk Recorder client and the push channel share timeout and
// credential settings through this module.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

/// Header carrying the optional Trunk Recorder API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout. Exceeding it surfaces as a transport timeout.
    pub timeout: Duration,
    /// Optional API key sent with every request.
    pub api_key: Option<SecretString>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            api_key: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .user_agent(concat!("scanfeed/", env!("CARGO_PKG_VERSION")));

        let headers = self.default_headers()?;
        if !headers.is_empty() {
            builder = builder.default_headers(headers);
        }

        Ok(builder.build()?)
    }

    /// Headers applied to every request (currently only the API key).
    pub fn default_headers(&self) -> Result<HeaderMap, crate::error::Error> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.api_key {
            let mut value = HeaderValue::from_str(key.expose_secret()).map_err(|e| {
                crate::error::Error::Deserialization {
                    message: format!("API key is not a valid header value: {e}"),
                    body: String::new(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }
        Ok(headers)
    }

    /// Timeout in whole seconds, for error reporting.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}
