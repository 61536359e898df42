pub mod cli;
pub mod config;
pub mod jsonrpc;
pub mod logging;

// 公開API
pub use config::ClientConfig;
pub use jsonrpc::{
    Batch, Call, CallId, Client, ClientError, ErrorCode, Pending, Response, ResponseFuture,
    ResponseSet, RpcError,
};
pub use logging::Logger;
