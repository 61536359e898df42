//! JSON-RPC 2.0 client
//!
//! Single calls, notifications and batches mixing both are sent as one JSON
//! array per dispatch. Every method call gets its own [`ResponseFuture`];
//! every dispatch that contains at least one method call also gets a
//! [`ResponseSet`] whose aggregate future covers the whole reply.
//!
//! ## Main components
//!
//! - [`types`]: wire objects, error code catalogue, response classification
//! - [`message`]: the call model (method calls and notifications)
//! - [`future`]: single-assignment, multi-subscriber completion cell
//! - [`engine`]: serialization, dispatch and reply correlation
//! - [`client`]: endpoint-bound façade and [`Batch`] builder
//!
//! ## Usage
//!
//! ```rust,no_run
//! use jrpc::jsonrpc::Client;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("http://localhost:4567/json_rpc")?;
//!
//! let mut batch = client.batch_request();
//! let sum = batch.method("sum", Some(json!([1, 2])), None)?;
//! batch.notify("log", Some(json!("hello")))?;
//! let all = batch.send(None)?.expect("batch has a method call");
//!
//! sum.on_success(|answer| println!("sum = {}", answer.result));
//! let replies = all.await?;
//! println!("{} replies", replies.len());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod engine;
pub mod error;
pub mod future;
pub mod message;
pub mod pending;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use batch::{Batch, BatchError};
pub use client::{Client, Outgoing, Pending};
pub use engine::CorrelationEngine;
pub use error::{ClientError, ClientResult, TransportError};
pub use future::{Completion, Deferred, FutureError};
pub use message::{Call, CallId, MethodCall, Notification};
pub use pending::{BatchOutcome, CallOutcome, ResponseFuture, ResponseSet};
pub use transport::{HttpTransport, Transport};
pub use types::{ErrorCode, ErrorResponse, Response, RpcError, SuccessResponse};
