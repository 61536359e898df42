use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;

use super::batch::Batch;
use super::engine::CorrelationEngine;
use super::error::{ClientError, ClientResult};
use super::message::{Call, CallId};
use super::pending::{ResponseFuture, ResponseSet};
use super::transport::{HttpTransport, Transport};
use crate::config::ClientConfig;
use crate::logging::Logger;

/// What `Client::send` accepts: one call or an ordered list of calls
#[derive(Debug, Clone)]
pub enum Outgoing {
    Single(Call),
    Batch(Vec<Call>),
}

impl From<Call> for Outgoing {
    fn from(call: Call) -> Self {
        Outgoing::Single(call)
    }
}

impl From<Vec<Call>> for Outgoing {
    fn from(calls: Vec<Call>) -> Self {
        Outgoing::Batch(calls)
    }
}

/// What `Client::send` hands back, mirroring the shape it was given
#[derive(Debug, Clone)]
pub enum Pending {
    Single(ResponseFuture),
    Batch(ResponseSet),
}

impl Pending {
    pub fn into_single(self) -> Option<ResponseFuture> {
        match self {
            Pending::Single(future) => Some(future),
            Pending::Batch(_) => None,
        }
    }

    pub fn into_batch(self) -> Option<ResponseSet> {
        match self {
            Pending::Single(_) => None,
            Pending::Batch(set) => Some(set),
        }
    }
}

/// JSON-RPC client bound to one endpoint.
///
/// Cloning is cheap; clones share the endpoint and the transport. Each
/// dispatch keeps its own resolution state, so any number of them may be in
/// flight at once.
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Arc<Url>,
    engine: CorrelationEngine,
}

impl Client {
    /// Client with default settings talking HTTP to `endpoint`
    pub fn new(endpoint: &str) -> ClientResult<Self> {
        Self::from_config(&ClientConfig::new(endpoint))
    }

    /// Client talking HTTP as described by `config`, logging nowhere
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let endpoint = config.endpoint_url()?;
        let transport = HttpTransport::new(
            endpoint.clone(),
            config.timeout(),
            config.user_agent.clone(),
        )?;
        Ok(Self::with_transport(endpoint, Arc::new(transport)))
    }

    /// Client using a caller-provided transport
    pub fn with_transport(endpoint: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: Arc::new(endpoint),
            engine: CorrelationEngine::new(transport),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        logger.debug(format_args!("Initialization client {}", self.endpoint));
        self.engine = self.engine.with_logger(logger);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn engine(&self) -> &CorrelationEngine {
        &self.engine
    }

    /// Send one call or a list of calls.
    ///
    /// A single method call yields `Pending::Single`, a list with at least
    /// one method call yields `Pending::Batch`, and notifications alone
    /// yield `None`. The wire payload is an array in every case.
    pub fn send(&self, outgoing: impl Into<Outgoing>) -> ClientResult<Option<Pending>> {
        match outgoing.into() {
            Outgoing::Single(call) => Ok(self
                .engine
                .send(vec![call])?
                .and_then(|set| set.into_futures().into_iter().next())
                .map(Pending::Single)),
            Outgoing::Batch(calls) => Ok(self.engine.send(calls)?.map(Pending::Batch)),
        }
    }

    /// Call `method` and return the future of its answer
    pub fn method(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        id: Option<CallId>,
    ) -> ClientResult<ResponseFuture> {
        let call = Call::method(method, params, id)?;
        self.send(call)?
            .and_then(Pending::into_single)
            .ok_or(ClientError::EmptyDispatch)
    }

    /// Fire a notification; no answer is expected
    pub fn notify(&self, method: impl Into<String>, params: Option<Value>) -> ClientResult<()> {
        self.send(Call::notification(method, params)?)?;
        Ok(())
    }

    /// Fresh batch bound to this client
    pub fn batch_request(&self) -> Batch {
        Batch::bound_to(self.clone())
    }
}
