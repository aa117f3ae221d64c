use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Status of a recorded call, as written by the instrumenter.
/// `Active` and `Waiting` also get derived during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Done,
    Error,
    Active,
    Waiting,
}

/// Flattened representation of a failure captured during the instrumented run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedError {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl SerializedError {
    /// Display text: the stack verbatim when present and non-empty,
    /// otherwise `"name: message"`.
    pub fn display_text(&self) -> String {
        match self.stack.as_deref() {
            Some(stack) if !stack.is_empty() => stack.to_string(),
            _ => format!("{}: {}", self.name, self.message),
        }
    }
}

/// Whether an error is a failed expectation rather than a crash.
/// Failed expectations already show on the call row that raised them,
/// so the caught-exception block skips them.
pub fn is_assertion_failure(error: &SerializedError) -> bool {
    error.name.contains("AssertionError") || error.message.starts_with("expect(")
}

/// One recorded invocation of an instrumented function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub method: String,
    /// Rendered argument text, already stringified by the instrumenter.
    #[serde(default)]
    pub args: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CallStatus>,
    /// Set for calls made inside another instrumented call.
    #[serde(skip_serializing_if = "Option::is_none", rename = "parentId")]
    pub parent_id: Option<String>,
    /// Interceptor-internal calls the instrumenter recorded but does not
    /// want shown by default.
    #[serde(default)]
    pub hidden: bool,
}

/// A full recorded run, as serialized by the instrumenter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    /// Source file of the instrumented test, when known.
    #[serde(skip_serializing_if = "Option::is_none", rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub calls: Vec<Call>,
    /// Exception caught while running the instrumented function.
    #[serde(skip_serializing_if = "Option::is_none", rename = "caughtException")]
    pub caught_exception: Option<SerializedError>,
    /// Errors that escaped the instrumented function entirely. Absent and
    /// present-but-empty are distinct: presence alone makes the
    /// unhandled-errors block render.
    #[serde(skip_serializing_if = "Option::is_none", rename = "unhandledErrors")]
    pub unhandled_errors: Option<Vec<SerializedError>>,
    /// Set when this run's results differ from the results recorded by the
    /// CLI run of the same test.
    #[serde(default, rename = "hasResultMismatch")]
    pub has_result_mismatch: bool,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot read trace file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse trace file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Trace {
    /// Load a trace from a JSON file written by the instrumenter.
    pub fn load(path: &Path) -> Result<Self, TraceError> {
        let path_str = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| TraceError::Read {
            path: path_str.clone(),
            source,
        })?;
        let trace: Trace =
            serde_json::from_str(&content).map_err(|source| TraceError::Parse {
                path: path_str.clone(),
                source,
            })?;
        tracing::debug!(path = %path_str, calls = trace.calls.len(), "loaded trace");
        Ok(trace)
    }

    pub fn has_exception(&self) -> bool {
        self.caught_exception.is_some()
    }

    /// Lookup map from call id to call, for rendering child rows.
    pub fn calls_by_id(&self) -> HashMap<&str, &Call> {
        self.calls.iter().map(|c| (c.id.as_str(), c)).collect()
    }

    /// Ids of calls made inside the given call, in recorded order.
    pub fn child_call_ids(&self, id: &str) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(id))
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Top-level calls, optionally including interceptor-hidden ones.
    pub fn interactions(&self, show_hidden: bool) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| c.parent_id.is_none() && (show_hidden || !c.hidden))
            .collect()
    }
}
