use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;

use super::future::{Completion, Deferred, FutureError};
use super::message::{CallId, MethodCall};
use super::types::{ErrorResponse, Response, RpcError, SuccessResponse};

/// Outcome of one method call
pub type CallOutcome = Result<SuccessResponse, ErrorResponse>;

/// Outcome of a whole dispatch: every reply element, in server order
pub type BatchOutcome = Result<Vec<Response>, RpcError>;

/// Completion handle for a single method call.
///
/// Carries the call it was created for, so subscribers can tell which
/// request an answer belongs to.
#[derive(Debug, Clone)]
pub struct ResponseFuture {
    id: CallId,
    method: String,
    params: Option<Value>,
    deferred: Deferred<SuccessResponse, ErrorResponse>,
}

impl ResponseFuture {
    pub fn for_call(call: &MethodCall) -> Self {
        Self {
            id: call.id().clone(),
            method: call.method().to_string(),
            params: call.params().cloned(),
            deferred: Deferred::new(),
        }
    }

    pub fn id(&self) -> &CallId {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.deferred.is_pending()
    }

    pub fn outcome(&self) -> Option<CallOutcome> {
        self.deferred.outcome()
    }

    pub fn on_success<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&SuccessResponse) + Send + 'static,
    {
        self.deferred.on_success(callback)
    }

    pub fn on_failure<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&ErrorResponse) + Send + 'static,
    {
        self.deferred.on_failure(callback)
    }

    pub fn on_complete<F>(&self, callback: F) -> bool
    where
        F: FnOnce(Result<&SuccessResponse, &ErrorResponse>) + Send + 'static,
    {
        self.deferred.on_complete(callback)
    }

    /// Complete with the server's answer; success or failure mirrors the
    /// answer's own kind
    pub(crate) fn resolve(&self, response: Response) -> Result<Completion, FutureError> {
        self.deferred.complete(response.into_result())
    }

    /// Fail with an error produced by the client itself
    pub(crate) fn reject(&self, error: RpcError) -> Result<Completion, FutureError> {
        self.deferred.fail(ErrorResponse {
            id: Some(self.id.clone()),
            error,
        })
    }
}

impl Future for ResponseFuture {
    type Output = CallOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.deferred).poll(cx)
    }
}

/// Per-call futures of one dispatch plus the future of the dispatch as a
/// whole
#[derive(Debug, Clone)]
pub struct ResponseSet {
    responses: Vec<ResponseFuture>,
    aggregate: Deferred<Vec<Response>, RpcError>,
}

impl ResponseSet {
    pub fn new(responses: Vec<ResponseFuture>) -> Self {
        Self {
            responses,
            aggregate: Deferred::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResponseFuture> {
        self.responses.iter()
    }

    pub fn first(&self) -> Option<&ResponseFuture> {
        self.responses.first()
    }

    pub fn get(&self, id: &CallId) -> Option<&ResponseFuture> {
        self.responses.iter().find(|r| r.id() == id)
    }

    pub fn into_futures(self) -> Vec<ResponseFuture> {
        self.responses
    }

    pub fn is_pending(&self) -> bool {
        self.aggregate.is_pending()
    }

    pub fn outcome(&self) -> Option<BatchOutcome> {
        self.aggregate.outcome()
    }

    /// Run `callback` with every reply element once the reply is parsed
    pub fn on_success<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&Vec<Response>) + Send + 'static,
    {
        self.aggregate.on_success(callback)
    }

    /// Run `callback` when the dispatch fails as a whole
    pub fn on_failure<F>(&self, callback: F) -> bool
    where
        F: FnOnce(&RpcError) + Send + 'static,
    {
        self.aggregate.on_failure(callback)
    }

    pub fn on_complete<F>(&self, callback: F) -> bool
    where
        F: FnOnce(Result<&Vec<Response>, &RpcError>) + Send + 'static,
    {
        self.aggregate.on_complete(callback)
    }

    pub(crate) fn aggregate(&self) -> &Deferred<Vec<Response>, RpcError> {
        &self.aggregate
    }
}

impl<'a> IntoIterator for &'a ResponseSet {
    type Item = &'a ResponseFuture;
    type IntoIter = std::slice::Iter<'a, ResponseFuture>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

impl Future for ResponseSet {
    type Output = BatchOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.aggregate).poll(cx)
    }
}
