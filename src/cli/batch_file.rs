use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::jsonrpc::{Call, CallId};

/// One line item of a batch file
///
/// ```json
/// [
///   {"method": "sum", "params": [1, 2], "id": 1},
///   {"method": "log", "params": "hello", "notify": true}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchEntry {
    pub method: String,

    #[serde(default)]
    pub params: Option<Value>,

    /// Generated when absent
    #[serde(default)]
    pub id: Option<CallId>,

    #[serde(default)]
    pub notify: bool,
}

impl BatchEntry {
    pub fn into_call(self) -> Result<Call> {
        if self.notify {
            if self.id.is_some() {
                bail!("notification '{}' must not carry an id", self.method);
            }
            return Ok(Call::notification(self.method, self.params)?);
        }
        Ok(Call::method(self.method, self.params, self.id)?)
    }
}

/// Parse a batch file into calls, keeping the file's order
pub fn parse_batch(text: &str) -> Result<Vec<Call>> {
    let entries: Vec<BatchEntry> =
        serde_json::from_str(text).context("Batch file must be a JSON array of calls")?;
    if entries.is_empty() {
        bail!("Batch file contains no calls");
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.into_call().with_context(|| format!("Invalid call #{}", i)))
        .collect()
}
