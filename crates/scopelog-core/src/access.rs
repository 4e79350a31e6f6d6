//! Access log data model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Captured headers and body of one side of an HTTP exchange.
///
/// A body that parsed as JSON lives in `data_object` and leaves
/// `data_string` empty; anything else is kept verbatim in `data_string`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpData {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_object: Option<Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_string: String,
}

/// One access log event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessLogData {
    /// Request URL (client side) or path (server side)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default)]
    pub request: HttpData,

    #[serde(default)]
    pub response: HttpData,

    /// Every failure seen during the call, flattened
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// Wall-clock duration in milliseconds
    #[serde(default)]
    pub elapsed_time: i64,
}
