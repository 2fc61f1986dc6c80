//! Record to document transform
//!
//! Each [`AnalyticsRecord`] is flattened into a [`Document`]: a fixed set of
//! base fields plus any fields carried in the record's tags. Documents for a
//! batch are wrapped in an envelope before being sent:
//!
//! ```text
//! {"records": [ {"timestamp": "...", "environment": "...", ...}, ... ]}
//! ```

use crate::analytics::{AnalyticsRecord, zero_time};
use crate::error::PluginError;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Flat field name to value mapping, one per record
pub type Document = serde_json::Map<String, Value>;

/// First segment of a structured `engine-cloudlog::<key>::<value>` tag
pub const STRUCTURED_TAG_MARKER: &str = "engine-cloudlog";

const STRUCTURED_TAG_SEPARATOR: &str = "::";

/// Prefix tags and the field each one fills.
///
/// Checked in order, first match wins, so `accept-language-` must stay ahead
/// of the bare `accept-` rule.
const HEADER_TAG_PREFIXES: &[(&str, &str)] = &[
    ("x-origin-path-", "origin_path"),
    ("x-origin-method-", "origin_method"),
    ("accept-language-", "accept_language"),
    ("accept-", "accept"),
    ("content-type-", "content_type"),
    ("referer-", "referer"),
    ("origin-", "origin"),
];

/// Set from configuration only; tags never override it
const ENVIRONMENT_FIELD: &str = "environment";

/// Fields present in every document
pub const BASE_FIELDS: &[&str] = &[
    "timestamp",
    "environment",
    "method",
    "host",
    "path",
    "raw_path",
    "response_code",
    "api_key",
    "api_version",
    "api_name",
    "api_id",
    "org_id",
    "oauth_id",
    "raw_request",
    "raw_response",
    "request_time",
    "ip_address",
    "user_agent",
    "track_path",
    "expire_at",
    "day",
    "month",
    "year",
    "hour",
    "content_length",
    "tags",
];

/// Top-level JSON wrapper for one batch
#[derive(Serialize)]
struct Envelope<'a> {
    records: &'a [Document],
}

/// Format a timestamp as RFC3339 with second precision, keeping its offset
/// (`2024-03-01T12:30:00Z`, `2024-03-01T14:30:00+02:00`)
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the document for a single record
///
/// `environment` comes from the pump's configuration and is never taken from
/// the record.
pub fn build_document(record: &AnalyticsRecord, environment: &str) -> Document {
    let mut doc = base_fields(record, environment);
    apply_structured_tags(&record.tags, &mut doc);
    apply_header_tags(&record.tags, &mut doc);
    doc
}

fn base_fields(record: &AnalyticsRecord, environment: &str) -> Document {
    let expire_at = format_timestamp(&record.expire_at.unwrap_or_else(zero_time));

    let mut doc = Document::new();
    doc.insert("timestamp".into(), format_timestamp(&record.timestamp).into());
    doc.insert(ENVIRONMENT_FIELD.into(), environment.into());
    doc.insert("method".into(), record.method.clone().into());
    doc.insert("host".into(), record.host.clone().into());
    doc.insert("path".into(), record.path.clone().into());
    doc.insert("raw_path".into(), record.raw_path.clone().into());
    doc.insert("response_code".into(), record.response_code.into());
    doc.insert("api_key".into(), record.api_key.clone().into());
    doc.insert("api_version".into(), record.api_version.clone().into());
    doc.insert("api_name".into(), record.api_name.clone().into());
    doc.insert("api_id".into(), record.api_id.clone().into());
    doc.insert("org_id".into(), record.org_id.clone().into());
    doc.insert("oauth_id".into(), record.oauth_id.clone().into());
    doc.insert("raw_request".into(), record.raw_request.clone().into());
    doc.insert("raw_response".into(), record.raw_response.clone().into());
    doc.insert("request_time".into(), record.request_time.into());
    doc.insert("ip_address".into(), record.ip_address.clone().into());
    doc.insert("user_agent".into(), record.user_agent.clone().into());
    doc.insert("track_path".into(), record.track_path.into());
    doc.insert("expire_at".into(), expire_at.into());
    doc.insert("day".into(), record.day.into());
    doc.insert("month".into(), record.month.into());
    doc.insert("year".into(), record.year.into());
    doc.insert("hour".into(), record.hour.into());
    doc.insert("content_length".into(), record.content_length.into());
    doc.insert("tags".into(), record.tags.clone().into());
    doc
}

/// Copy `engine-cloudlog::<key>::<value>` tags into the document
pub fn apply_structured_tags(tags: &[String], doc: &mut Document) {
    for tag in tags {
        let parts: Vec<&str> = tag.split(STRUCTURED_TAG_SEPARATOR).collect();
        if let [STRUCTURED_TAG_MARKER, key, value] = parts.as_slice() {
            set_tag_field(doc, key, value);
        }
    }
}

/// Copy header-style prefix tags (`referer-...`, `accept-...`) into the document
pub fn apply_header_tags(tags: &[String], doc: &mut Document) {
    for tag in tags {
        let matched = HEADER_TAG_PREFIXES
            .iter()
            .find_map(|(prefix, field)| tag.strip_prefix(prefix).map(|value| (*field, value)));

        if let Some((field, value)) = matched {
            set_tag_field(doc, field, value);
        }
    }
}

fn set_tag_field(doc: &mut Document, key: &str, value: &str) {
    if key == ENVIRONMENT_FIELD {
        debug!(field = key, "Ignoring tag that would overwrite the configured environment");
        return;
    }
    doc.insert(key.to_string(), Value::String(value.to_string()));
}

/// Serialize documents as `{"records": [...]}`
pub fn encode_envelope(documents: &[Document]) -> Result<Vec<u8>, PluginError> {
    serde_json::to_vec(&Envelope { records: documents })
        .map_err(|e| PluginError::Serialization(format!("failed to marshal decoded data: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn make_record(tags: &[&str]) -> AnalyticsRecord {
        AnalyticsRecord {
            method: "POST".to_string(),
            host: "api.example.com".to_string(),
            path: "/v1/orders".to_string(),
            raw_path: "/v1/orders?x=1".to_string(),
            response_code: 201,
            api_name: "orders".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap().into(),
            request_time: 17,
            day: 1,
            month: 3,
            year: 2024,
            hour: 12,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_base_fields_present() {
        let doc = build_document(&make_record(&[]), "prod");

        assert_eq!(doc.len(), BASE_FIELDS.len());
        for field in BASE_FIELDS {
            assert!(doc.contains_key(*field), "missing base field {field}");
        }
        assert_eq!(doc["method"], "POST");
        assert_eq!(doc["response_code"], 201);
        assert_eq!(doc["request_time"], 17);
        assert_eq!(doc["month"], 3);
        assert_eq!(doc["track_path"], false);
    }

    #[test]
    fn test_timestamps_are_rfc3339() {
        let mut record = make_record(&[]);
        record.expire_at = Some(Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap().into());

        let doc = build_document(&record, "prod");
        assert_eq!(doc["timestamp"], "2024-03-01T12:30:05Z");
        assert_eq!(doc["expire_at"], "2024-03-08T00:00:00Z");
    }

    #[test]
    fn test_timestamps_keep_their_offset() {
        let mut record = make_record(&[]);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        record.timestamp = plus_two.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let doc = build_document(&record, "prod");
        assert_eq!(doc["timestamp"], "2024-06-01T12:00:00+02:00");
    }

    #[test]
    fn test_missing_times_format_as_zero_time() {
        let record = AnalyticsRecord::default();

        let doc = build_document(&record, "prod");
        assert_eq!(doc["timestamp"], "0001-01-01T00:00:00Z");
        assert_eq!(doc["expire_at"], "0001-01-01T00:00:00Z");
    }

    #[test]
    fn test_environment_from_config() {
        let doc = build_document(&make_record(&[]), "staging");
        assert_eq!(doc["environment"], "staging");
    }

    #[test]
    fn test_structured_tag() {
        let doc = build_document(&make_record(&["engine-cloudlog::foo::bar"]), "prod");
        assert_eq!(doc["foo"], "bar");
    }

    #[test]
    fn test_structured_tag_wrong_shape_ignored() {
        let doc = build_document(
            &make_record(&[
                "engine-cloudlog::foo",
                "engine-cloudlog::a::b::c",
                "other::foo::bar",
            ]),
            "prod",
        );
        assert_eq!(doc.len(), BASE_FIELDS.len());
    }

    #[test]
    fn test_structured_tag_overrides_base_field() {
        let doc = build_document(
            &make_record(&["engine-cloudlog::api_name::override"]),
            "prod",
        );
        assert_eq!(doc["api_name"], "override");
        assert_eq!(doc.len(), BASE_FIELDS.len());
    }

    #[test]
    fn test_structured_tag_cannot_override_environment() {
        let doc = build_document(
            &make_record(&["engine-cloudlog::environment::dev"]),
            "prod",
        );
        assert_eq!(doc["environment"], "prod");
    }

    #[test]
    fn test_origin_path_tag() {
        let doc = build_document(&make_record(&["x-origin-path-/v1/test"]), "prod");
        assert_eq!(doc["origin_path"], "/v1/test");
        assert!(!doc.contains_key("origin"));
    }

    #[test]
    fn test_origin_method_tag() {
        let doc = build_document(&make_record(&["x-origin-method-PATCH"]), "prod");
        assert_eq!(doc["origin_method"], "PATCH");
    }

    #[test]
    fn test_accept_language_does_not_set_accept() {
        let doc = build_document(&make_record(&["accept-language-en-US"]), "prod");
        assert_eq!(doc["accept_language"], "en-US");
        assert!(!doc.contains_key("accept"));
    }

    #[test]
    fn test_accept_tag() {
        let doc = build_document(&make_record(&["accept-text/html"]), "prod");
        assert_eq!(doc["accept"], "text/html");
        assert!(!doc.contains_key("accept_language"));
    }

    #[test]
    fn test_remaining_header_tags() {
        let doc = build_document(
            &make_record(&[
                "content-type-application/json",
                "referer-https://example.com/page",
                "origin-https://example.com",
            ]),
            "prod",
        );
        assert_eq!(doc["content_type"], "application/json");
        assert_eq!(doc["referer"], "https://example.com/page");
        assert_eq!(doc["origin"], "https://example.com");
    }

    #[test]
    fn test_last_tag_wins() {
        let doc = build_document(
            &make_record(&["origin-https://first.example", "origin-https://second.example"]),
            "prod",
        );
        assert_eq!(doc["origin"], "https://second.example");
    }

    #[test]
    fn test_header_tag_overrides_structured_tag() {
        let doc = build_document(
            &make_record(&["referer-from-header", "engine-cloudlog::referer::from-structured"]),
            "prod",
        );
        assert_eq!(doc["referer"], "from-header");
    }

    #[test]
    fn test_documents_do_not_share_tag_fields() {
        let first = build_document(&make_record(&["engine-cloudlog::team::payments"]), "prod");
        let second = build_document(&make_record(&[]), "prod");
        assert_eq!(first["team"], "payments");
        assert!(!second.contains_key("team"));
    }

    #[test]
    fn test_envelope_keeps_order() {
        let docs: Vec<Document> = ["/a", "/b", "/c"]
            .iter()
            .map(|path| {
                let mut record = make_record(&[]);
                record.path = path.to_string();
                build_document(&record, "prod")
            })
            .collect();

        let body = encode_envelope(&docs).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        let records = parsed["records"].as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["path"], "/a");
        assert_eq!(records[2]["path"], "/c");
    }

    #[test]
    fn test_empty_envelope() {
        let body = encode_envelope(&[]).unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, json!({"records": []}));
    }
}
