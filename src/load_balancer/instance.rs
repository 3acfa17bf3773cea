//! Backend instance record.

use serde::{Deserialize, Serialize};
use url::Url;

/// One network-addressable backend process of a logical service.
///
/// Immutable once constructed; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
}

impl ServiceInstance {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            secure: false,
        }
    }

    /// Same instance, reached over TLS.
    pub fn secured(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// Base URL of the instance, e.g. `http://10.0.0.2:7700/`.
    pub fn uri(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}:{}", self.scheme(), self.host, self.port))
    }
}
