use std::collections::HashSet;

use serde_json::Value;

use super::client::Client;
use super::error::{ClientError, ClientResult};
use super::message::{Call, CallId, MethodCall, Notification};
use super::pending::{ResponseFuture, ResponseSet};

/// Ordered set of calls sent as one wire transaction.
///
/// Futures for method calls are handed out as soon as the call is added,
/// so subscribers can be attached before anything goes on the wire.
/// `send` consumes the batch: once sent it can neither grow nor be sent
/// again.
#[derive(Debug, Default)]
pub struct Batch {
    calls: Vec<Call>,
    pending: Vec<ResponseFuture>,
    ids: HashSet<CallId>,
    client: Option<Client>,
}

impl Batch {
    /// Create a batch that is not bound to any client
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batch bound to `client`
    pub fn bound_to(client: Client) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Append a notification
    pub fn notify(&mut self, method: impl Into<String>, params: Option<Value>) -> ClientResult<()> {
        self.calls.push(Notification::new(method, params)?.into());
        Ok(())
    }

    /// Append a method call and return its future
    pub fn method(
        &mut self,
        method: impl Into<String>,
        params: Option<Value>,
        id: Option<CallId>,
    ) -> ClientResult<ResponseFuture> {
        self.push_method(MethodCall::with_id(method, params, id)?)
    }

    /// Append a prebuilt call; method calls get a future
    pub fn push(&mut self, call: Call) -> ClientResult<Option<ResponseFuture>> {
        match call {
            Call::Method(method) => self.push_method(method).map(Some),
            Call::Notification(notification) => {
                self.calls.push(notification.into());
                Ok(None)
            }
        }
    }

    fn push_method(&mut self, call: MethodCall) -> ClientResult<ResponseFuture> {
        if !self.ids.insert(call.id().clone()) {
            return Err(ClientError::DuplicateId(call.id().clone()));
        }
        let future = ResponseFuture::for_call(&call);
        self.pending.push(future.clone());
        self.calls.push(call.into());
        Ok(future)
    }

    /// Send the batch through its bound client, or through `client` when
    /// the batch is unbound.
    ///
    /// Returns `None` when the batch holds only notifications. A batch that
    /// cannot be sent comes back inside the error, untouched, so its
    /// futures can still be completed by a later `send`.
    pub fn send(self, client: Option<&Client>) -> Result<Option<ResponseSet>, BatchError> {
        let client = match self.binding(client) {
            Ok(client) => client,
            Err(error) => return Err(BatchError { error, batch: self }),
        };
        let prepared = match client.engine().prepare(&self.calls) {
            Ok(prepared) => prepared,
            Err(error) => return Err(BatchError { error, batch: self }),
        };
        Ok(client.engine().launch(prepared, self.pending))
    }

    fn binding(&self, client: Option<&Client>) -> ClientResult<Client> {
        match (&self.client, client) {
            (Some(_), Some(_)) => Err(ClientError::AmbiguousClient),
            (Some(bound), None) => Ok(bound.clone()),
            (None, Some(explicit)) => Ok(explicit.clone()),
            (None, None) => Err(ClientError::MissingClient),
        }
    }
}

/// A batch that was rejected before anything went on the wire
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct BatchError {
    pub error: ClientError,
    /// The rejected batch, with its calls and pending futures intact
    pub batch: Batch,
}

impl BatchError {
    pub fn into_batch(self) -> Batch {
        self.batch
    }
}
