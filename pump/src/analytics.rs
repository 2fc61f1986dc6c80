//! Analytics records consumed by pumps
//!
//! Records arrive from the gateway's analytics collector already populated.
//! Field names follow the collector's JSON encoding so batches can be read
//! straight off the wire.

use crate::error::PluginError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One API request as recorded by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsRecord {
    pub method: String,
    pub host: String,
    pub path: String,
    pub raw_path: String,
    pub content_length: i64,
    pub user_agent: String,
    pub day: i32,
    pub month: i32,
    pub year: i32,
    pub hour: i32,
    pub response_code: i32,
    pub api_key: String,
    pub timestamp: DateTime<FixedOffset>,
    pub api_version: String,
    pub api_name: String,
    pub api_id: String,
    pub org_id: String,
    pub oauth_id: String,
    /// Request time in milliseconds
    pub request_time: i64,
    pub raw_request: String,
    pub raw_response: String,
    pub ip_address: String,
    pub tags: Vec<String>,
    pub track_path: bool,
    #[serde(rename = "expireAt")]
    pub expire_at: Option<DateTime<FixedOffset>>,
}

/// Seconds from the Unix epoch back to `0001-01-01T00:00:00Z`
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// The collector's "unset" time, `0001-01-01T00:00:00Z`
pub fn zero_time() -> DateTime<FixedOffset> {
    DateTime::from_timestamp(ZERO_TIME_SECS, 0)
        .unwrap_or_default()
        .fixed_offset()
}

impl Default for AnalyticsRecord {
    fn default() -> Self {
        Self {
            method: String::new(),
            host: String::new(),
            path: String::new(),
            raw_path: String::new(),
            content_length: 0,
            user_agent: String::new(),
            day: 0,
            month: 0,
            year: 0,
            hour: 0,
            response_code: 0,
            api_key: String::new(),
            timestamp: zero_time(),
            api_version: String::new(),
            api_name: String::new(),
            api_id: String::new(),
            org_id: String::new(),
            oauth_id: String::new(),
            request_time: 0,
            raw_request: String::new(),
            raw_response: String::new(),
            ip_address: String::new(),
            tags: Vec::new(),
            track_path: false,
            expire_at: None,
        }
    }
}

/// Decode an untyped batch into records
///
/// The whole batch is rejected if any element fails to decode; partial
/// batches are never handed to a pump.
pub fn decode_batch(values: Vec<serde_json::Value>) -> Result<Vec<AnalyticsRecord>, PluginError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value(value)
                .map_err(|e| PluginError::Record(format!("record {index}: {e}")))
        })
        .collect()
}

/// Decode newline-delimited JSON records
///
/// A line that is not JSON rejects the batch the same way a mistyped record
/// does.
pub fn decode_lines(lines: &[String]) -> Result<Vec<AnalyticsRecord>, PluginError> {
    let values = lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| PluginError::Record(format!("record {index}: {e}")))
        })
        .collect::<Result<Vec<serde_json::Value>, _>>()?;
    decode_batch(values)
}
