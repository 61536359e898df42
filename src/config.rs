use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::jsonrpc::error::{ClientError, ClientResult};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn default_timeout_ms() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_MS)
}

fn default_user_agent() -> String {
    format!("jrpc/{}", env!("CARGO_PKG_VERSION"))
}

/// Settings for a client talking HTTP to one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Absolute URI every dispatch is POSTed to
    pub endpoint: String,

    /// Whole-request timeout in milliseconds; `None` waits forever
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Parse and validate the endpoint
    pub fn endpoint_url(&self) -> ClientResult<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| ClientError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ClientError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: "endpoint must be an absolute URI with a host".to_string(),
            });
        }
        Ok(url)
    }
}
