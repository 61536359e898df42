use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use super::error::{ClientError, ClientResult, TransportError};
use crate::logging::Logger;

/// Moves one encoded dispatch to the server and brings back the reply body.
///
/// Connection handling, timeouts and TLS all live behind this trait; the
/// correlation engine only sees bytes in and bytes (or a failure) out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError>;
}

/// One HTTP POST per dispatch
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: Url,
    client: reqwest::Client,
    logger: Logger,
}

impl HttpTransport {
    pub fn new(endpoint: Url, timeout: Option<Duration>, user_agent: String) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::HttpSetup)?;

        Ok(Self {
            endpoint,
            client,
            logger: Logger::noop(),
        })
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        self.logger.debug(format_args!(
            "HTTP {} from {}",
            response.status(),
            self.endpoint
        ));

        // Any completed exchange counts as delivered; the body decides the rest.
        let bytes = response.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(error)
    }
}
