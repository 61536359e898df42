//! Correlation engine: turns an ordered list of calls into one wire payload,
//! hands it to the transport, and maps the reply back onto the futures of
//! the calls that expect an answer.
//!
//! Every future handed to the engine is completed exactly once, whatever
//! happens on the way:
//!
//! | reply | aggregate | per-call |
//! |---|---|---|
//! | transport failure | failed, 12600 | failed, 12600 |
//! | body is not a response array | failed, 12700 | failed, 12700 |
//! | array parsed | succeeded, all elements | mirrors its own element, or 12701 when absent |

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::error::{ClientError, ClientResult, TransportError};
use super::future::{Completion, FutureError};
use super::message::{Call, CallId};
use super::pending::{ResponseFuture, ResponseSet};
use super::transport::Transport;
use super::types::{decode_responses, ErrorCode, Request, Response, RpcError};
use crate::logging::Logger;

/// Serialize calls into a single JSON array, in insertion order
pub fn encode(calls: &[Call]) -> ClientResult<Vec<u8>> {
    let requests: Vec<Request<'_>> = calls
        .iter()
        .map(|call| Request::versioned(call.body()))
        .collect();
    Ok(serde_json::to_vec(&requests)?)
}

/// Reject a dispatch in which two method calls share an id
pub fn check_unique_ids(calls: &[Call]) -> ClientResult<()> {
    let mut seen = HashSet::new();
    for id in calls.iter().filter_map(Call::id) {
        if !seen.insert(id) {
            return Err(ClientError::DuplicateId(id.clone()));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct CorrelationEngine {
    transport: Arc<dyn Transport>,
    logger: Logger,
}

impl fmt::Debug for CorrelationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationEngine")
            .field("logger", &self.logger)
            .finish_non_exhaustive()
    }
}

impl CorrelationEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            logger: Logger::noop(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Dispatch `calls`, creating one future per method call.
    ///
    /// Returns `None` when no call expects an answer; the payload is still
    /// sent.
    pub fn send(&self, calls: Vec<Call>) -> ClientResult<Option<ResponseSet>> {
        let pending = calls
            .iter()
            .filter_map(|call| match call {
                Call::Method(method) => Some(ResponseFuture::for_call(method)),
                Call::Notification(_) => None,
            })
            .collect();
        self.dispatch(calls, pending)
    }

    /// Dispatch `calls` and complete the already created `pending` futures,
    /// one per method call.
    ///
    /// Must be called from within a tokio runtime: the transport round trip
    /// runs on a spawned task and this function returns right away.
    pub(crate) fn dispatch(
        &self,
        calls: Vec<Call>,
        pending: Vec<ResponseFuture>,
    ) -> ClientResult<Option<ResponseSet>> {
        let prepared = self.prepare(&calls)?;
        Ok(self.launch(prepared, pending))
    }

    /// Every check that can reject a dispatch, run without taking the calls
    pub(crate) fn prepare(&self, calls: &[Call]) -> ClientResult<Prepared> {
        if calls.is_empty() {
            return Err(ClientError::EmptyDispatch);
        }
        check_unique_ids(calls)?;

        let body = encode(calls)?;
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        Ok(Prepared {
            body,
            runtime,
            expected: calls.iter().filter(|c| c.needs_response()).count(),
        })
    }

    /// Put a prepared payload on the wire; `pending` holds one future per
    /// method call, in call order
    pub(crate) fn launch(
        &self,
        prepared: Prepared,
        pending: Vec<ResponseFuture>,
    ) -> Option<ResponseSet> {
        let Prepared {
            body,
            runtime,
            expected,
        } = prepared;
        debug_assert_eq!(pending.len(), expected);

        self.logger.debug(format_args!(
            "Sending request: {}",
            String::from_utf8_lossy(&body)
        ));

        let transport = Arc::clone(&self.transport);
        let logger = self.logger.clone();

        // 通知のみの場合は送りっぱなし
        if expected == 0 {
            runtime.spawn(async move {
                if let Err(error) = transport.send(body).await {
                    logger.error(format_args!("Error in http request: {}", error));
                }
            });
            return None;
        }

        let set = ResponseSet::new(pending);
        let in_flight = set.clone();
        // 応答の振り分けは送信タスク側で行う
        runtime.spawn(async move {
            let reply = transport.send(body).await;
            settle(&in_flight, reply, &logger);
        });

        Some(set)
    }
}

/// Encoded payload that passed every synchronous check
#[derive(Debug)]
pub(crate) struct Prepared {
    body: Vec<u8>,
    runtime: Handle,
    expected: usize,
}

/// Complete every future of `set` from the transport's reply
pub fn settle(set: &ResponseSet, reply: Result<Vec<u8>, TransportError>, logger: &Logger) {
    // トランスポート失敗は全件を同じエラーで失敗させる
    let body = match reply {
        Ok(body) => body,
        Err(error) => {
            logger.error(format_args!("Error in http request: {}", error));
            let error = RpcError::new(
                ErrorCode::RequestSendError,
                format!("Error in http request: {}", error),
            );
            return fail_all(set, error, logger);
        }
    };

    logger.debug(format_args!(
        "Getting response {}",
        String::from_utf8_lossy(&body)
    ));

    let responses = match decode_responses(&body) {
        Ok(responses) => responses,
        Err(error) => {
            logger.error(format_args!("HTTP response processing fail: {}", error));
            let error = RpcError::new(
                ErrorCode::RequestProcessingError,
                format!("Request processing error {}", error),
            );
            return fail_all(set, error, logger);
        }
    };

    // 同じidが複数ある場合は後の要素が優先される
    let mut by_id: HashMap<CallId, Response> = responses
        .iter()
        .filter_map(|r| r.id().map(|id| (id.clone(), r.clone())))
        .collect();

    // 全体のFutureを先に完了させ、その後で個別に振り分ける
    check_completed("batch", set.aggregate().succeed(responses), logger);

    for future in set {
        let completion = match by_id.remove(future.id()) {
            Some(response) => future.resolve(response),
            None => {
                // 応答が無いものはこの呼び出しだけ失敗させる
                logger.error(format_args!(
                    "Deferrable response without actual response (id {})",
                    future.id()
                ));
                future.reject(RpcError::new(
                    ErrorCode::RequestWithoutAnswer,
                    "Deferrable response without actual response",
                ))
            }
        };
        check_completed(future.id(), completion, logger);
    }
}

fn fail_all(set: &ResponseSet, error: RpcError, logger: &Logger) {
    check_completed("batch", set.aggregate().fail(error.clone()), logger);
    for future in set {
        check_completed(future.id(), future.reject(error.clone()), logger);
    }
}

/// A second completion means the engine lost track of a future; that is a
/// bug in the engine and must not go unnoticed.
fn check_completed(
    what: impl fmt::Display,
    completion: Result<Completion, FutureError>,
    logger: &Logger,
) {
    match completion {
        Ok(Completion { faulted: 0, .. }) => {}
        Ok(Completion { faulted, .. }) => logger.warn(format_args!(
            "{} subscriber(s) of {} panicked",
            faulted, what
        )),
        Err(error) => panic!("future for {} completed twice: {}", what, error),
    }
}
