use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::{ClientError, ClientResult};

/// Correlation id shared by a method call and its response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallId {
    Number(i64),
    String(String),
}

impl CallId {
    /// Random UUID v4 id, used when the caller does not supply one
    pub fn generate() -> Self {
        CallId::String(Uuid::new_v4().to_string())
    }

    /// Read an id out of a decoded response.
    ///
    /// Only strings and integers can correlate; anything else (`null`,
    /// floats, objects) yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(CallId::String(s.clone())),
            Value::Number(n) => n.as_i64().map(CallId::Number),
            _ => None,
        }
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallId::Number(n) => write!(f, "{}", n),
            CallId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CallId {
    fn from(value: i64) -> Self {
        CallId::Number(value)
    }
}

impl From<String> for CallId {
    fn from(value: String) -> Self {
        CallId::String(value)
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        CallId::String(value.to_string())
    }
}

fn checked_method(method: String) -> ClientResult<String> {
    if method.trim().is_empty() {
        return Err(ClientError::MissingMethod);
    }
    Ok(method)
}

/// A remote invocation that expects a correlated answer
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    id: CallId,
    method: String,
    params: Option<Value>,
}

impl MethodCall {
    /// Create a method call with a generated id
    pub fn new(method: impl Into<String>, params: Option<Value>) -> ClientResult<Self> {
        Self::with_id(method, params, None)
    }

    /// Create a method call, generating an id when `id` is `None`
    pub fn with_id(
        method: impl Into<String>,
        params: Option<Value>,
        id: Option<CallId>,
    ) -> ClientResult<Self> {
        Ok(Self {
            id: id.unwrap_or_else(CallId::generate),
            method: checked_method(method.into())?,
            params,
        })
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
}

/// A remote invocation with no answer and no id
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    method: String,
    params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> ClientResult<Self> {
        Ok(Self {
            method: checked_method(method.into())?,
            params,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }
}

/// One entry of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Method(MethodCall),
    Notification(Notification),
}

impl Call {
    /// Shorthand for `Call::Method(MethodCall::with_id(..))`
    pub fn method(
        method: impl Into<String>,
        params: Option<Value>,
        id: Option<CallId>,
    ) -> ClientResult<Self> {
        MethodCall::with_id(method, params, id).map(Call::Method)
    }

    /// Shorthand for `Call::Notification(Notification::new(..))`
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> ClientResult<Self> {
        Notification::new(method, params).map(Call::Notification)
    }

    pub fn needs_response(&self) -> bool {
        matches!(self, Call::Method(_))
    }

    pub fn id(&self) -> Option<&CallId> {
        match self {
            Call::Method(call) => Some(call.id()),
            Call::Notification(_) => None,
        }
    }

    pub fn method_name(&self) -> &str {
        match self {
            Call::Method(call) => call.method(),
            Call::Notification(notification) => notification.method(),
        }
    }

    /// Wire body without the protocol version tag
    pub fn body(&self) -> RequestBody<'_> {
        match self {
            Call::Method(call) => RequestBody {
                method: &call.method,
                params: call.params.as_ref(),
                id: Some(&call.id),
            },
            Call::Notification(notification) => RequestBody {
                method: &notification.method,
                params: notification.params.as_ref(),
                id: None,
            },
        }
    }
}

impl From<MethodCall> for Call {
    fn from(call: MethodCall) -> Self {
        Call::Method(call)
    }
}

impl From<Notification> for Call {
    fn from(notification: Notification) -> Self {
        Call::Notification(notification)
    }
}

/// `{method, params?, id?}` as it goes on the wire
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RequestBody<'a> {
    pub method: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a CallId>,
}
