//! Remote error payloads and their decoding into operator diagnostics.
//!
//! A module that rejects a request answers with
//! `{"error": {"message": ..., "details": [{"message", "code", "target"}]}}`.
//! `target` is a dotted path into the request body, e.g.
//! `properties.sources.2.type`, which lets us point at the offending node.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One per-field violation reported by the module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Structured error returned inside a direct-method response payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.details.push(detail);
        self
    }

    /// Lenient parse of an `error` value.
    ///
    /// Anything that is not the expected shape degrades to a message-only
    /// error; malformed detail entries are dropped.
    pub fn from_value(value: &Value) -> Self {
        let message = match value {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            other => other.to_string(),
        };

        let code = value
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);

        let details = value
            .get("details")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.is_object())
                    .filter_map(|item| serde_json::from_value::<ErrorDetail>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            message,
            code,
            details,
        }
    }
}

/// User-facing diagnostic produced from a remote error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field_path: None,
            node_name: None,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.node_name, &self.field_path) {
            (Some(node), Some(field)) => write!(f, "{} (node '{}', field '{}')", self.message, node, field),
            (None, Some(field)) => write!(f, "{} (field '{}')", self.message, field),
            (Some(node), None) => write!(f, "{} (node '{}')", self.message, node),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Decode a remote error into diagnostics.
///
/// The first diagnostic is always the top-level message. Each detail adds one
/// more; when its target has more than three segments the fourth is the field
/// name and `request.<s0>.<s1>.<s2>.name` (if present) names the node.
pub fn decode(error: &RemoteError, request: Option<&Value>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::with_capacity(error.details.len() + 1);
    diagnostics.push(Diagnostic::new(error.message.clone()));
    diagnostics.extend(error.details.iter().map(|detail| decode_detail(detail, request)));
    diagnostics
}

fn decode_detail(detail: &ErrorDetail, request: Option<&Value>) -> Diagnostic {
    let message = if detail.message.is_empty() {
        detail.code.clone().unwrap_or_default()
    } else {
        detail.message.clone()
    };

    let Some(target) = detail.target.as_deref().filter(|t| !t.is_empty()) else {
        return Diagnostic::new(message);
    };

    let segments: Vec<&str> = target.split('.').collect();
    if segments.len() <= 3 {
        return Diagnostic {
            message,
            field_path: Some(target.to_string()),
            node_name: None,
        };
    }

    let node_name = request
        .and_then(|payload| lookup_node_name(payload, &segments[..3]))
        .unwrap_or_else(|| segments[2].to_string());

    Diagnostic {
        message,
        field_path: Some(segments[3].to_string()),
        node_name: Some(node_name),
    }
}

fn lookup_node_name(payload: &Value, path: &[&str]) -> Option<String> {
    let mut current = payload;
    for segment in path {
        current = match current {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(*segment)?,
            _ => return None,
        };
    }
    current.get("name")?.as_str().map(str::to_string)
}
