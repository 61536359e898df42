use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::{CallId, RequestBody};

/// JSONRPC version tag attached to every outgoing request
pub const JSONRPC_VERSION: &str = "2.0";

/// JSONRPC 2.0 Request message
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Request<'a> {
    /// JSONRPC version - MUST be exactly "2.0"
    pub jsonrpc: &'static str,

    /// Method name, parameters and (for method calls) the id
    #[serde(flatten)]
    pub body: RequestBody<'a>,
}

impl<'a> Request<'a> {
    /// Tag a call body with the protocol version
    pub fn versioned(body: RequestBody<'a>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            body,
        }
    }
}

/// Fixed catalogue of error codes.
///
/// Negative codes come from the server and are passed through untouched.
/// Positive codes are produced by this client when a dispatch fails before
/// a server answer could be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidJson = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,

    /// Transport failed
    RequestSendError = 12600,
    /// Reply body could not be parsed
    RequestProcessingError = 12700,
    /// Reply array had no entry for the call's id
    RequestWithoutAnswer = 12701,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 8] = [
        ErrorCode::InvalidJson,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::RequestSendError,
        ErrorCode::RequestProcessingError,
        ErrorCode::RequestWithoutAnswer,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Whether the code is produced by this client rather than a server
    pub fn is_client_local(self) -> bool {
        matches!(
            self,
            ErrorCode::RequestSendError
                | ErrorCode::RequestProcessingError
                | ErrorCode::RequestWithoutAnswer
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidJson => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::RequestSendError => "Request send error",
            ErrorCode::RequestProcessingError => "Request processing error",
            ErrorCode::RequestWithoutAnswer => "Request without answer",
        }
    }
}

/// JSONRPC 2.0 Error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[error("RPC error [{code}]: {message}")]
pub struct RpcError {
    /// Error type indicator (must be integer)
    pub code: i64,

    /// Short error description
    pub message: String,

    /// Additional error information (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error with a catalogue code and a custom message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Create an error with the catalogue's default message
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.message())
    }

    /// Create an error with an arbitrary (server-defined) code
    pub fn custom(code: i64, message: String, data: Option<Value>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Catalogue entry for this code, if any
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    pub fn is_client_local(&self) -> bool {
        self.kind().is_some_and(ErrorCode::is_client_local)
    }
}

/// Successful answer to a method call
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessResponse {
    pub id: Option<CallId>,
    pub result: Value,
}

/// Failed answer to a method call, either from the server or synthesized
/// by the client
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub id: Option<CallId>,
    pub error: RpcError,
}

/// One element of a reply array
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn id(&self) -> Option<&CallId> {
        match self {
            Response::Success(r) => r.id.as_ref(),
            Response::Error(r) => r.id.as_ref(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn into_result(self) -> Result<SuccessResponse, ErrorResponse> {
        match self {
            Response::Success(r) => Ok(r),
            Response::Error(r) => Err(r),
        }
    }

    /// Classify a decoded reply element by the presence of an `error` member
    fn classify(index: usize, element: Value) -> Result<Self, DecodeError> {
        let Value::Object(mut fields) = element else {
            return Err(DecodeError::NotAnObject(index));
        };

        let id = fields.get("id").and_then(CallId::from_json);

        match fields.remove("error") {
            Some(Value::Null) | None => Ok(Response::Success(SuccessResponse {
                id,
                result: fields.remove("result").unwrap_or(Value::Null),
            })),
            Some(error) => {
                let error = serde_json::from_value::<RpcError>(error)
                    .map_err(|source| DecodeError::MalformedError { index, source })?;
                Ok(Response::Error(ErrorResponse { id, error }))
            }
        }
    }
}

/// Why a reply body could not be turned into responses
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of responses")]
    NotAnArray,

    #[error("response #{0} is not a JSON object")]
    NotAnObject(usize),

    #[error("response #{index} has a malformed error object: {source}")]
    MalformedError {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a reply body into responses, keeping the server's order
pub fn decode_responses(body: &[u8]) -> Result<Vec<Response>, DecodeError> {
    let Value::Array(elements) = serde_json::from_slice::<Value>(body)? else {
        return Err(DecodeError::NotAnArray);
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| Response::classify(index, element))
        .collect()
}
