//! CloudLog pump
//!
//! Flattens analytics records into documents and POSTs each batch as
//! `{"records": [...]}` to a CloudLog ingestion endpoint.
//!
//! Delivery is best-effort: request, transport, timeout and cancellation
//! failures are logged and the write still succeeds. Only a batch that cannot
//! be serialized is reported back to the caller.
//!
//! # Example
//!
//! ```ignore
//! let mut pump = CloudLogPump::new();
//! pump.init(&json!({
//!     "url": "https://logs.example.com/ingest",
//!     "token": "Bearer abc123",
//!     "environment": "production",
//! }))?;
//! pump.set_timeout(5);
//! pump.write_data(&CancellationToken::new(), &records).await?;
//! ```

use crate::analytics::AnalyticsRecord;
use crate::document::{Document, build_document, encode_envelope};
use crate::error::PluginError;
use crate::pump::Pump;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, error, info, info_span};
use url::Url;

/// Log prefix attached to every line emitted by this pump
pub const CLOUDLOG_PUMP_PREFIX: &str = "cloudlog-pump";

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the CloudLog pump
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CloudLogConfig {
    /// Ingestion endpoint
    pub url: Url,

    /// Sent verbatim as the `Authorization` header
    #[serde(default)]
    pub token: String,

    /// Injected into every document as `environment`
    #[serde(default)]
    pub environment: String,
}

impl CloudLogConfig {
    /// Decode and validate an opaque configuration value
    pub fn from_value(conf: &serde_json::Value) -> Result<Self, PluginError> {
        let config: CloudLogConfig = serde_json::from_value(conf.clone())
            .map_err(|e| PluginError::Init(format!("failed to decode configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<(), PluginError> {
        match self.url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(PluginError::Init(format!(
                    "unsupported url scheme '{other}' (expected http or https)"
                )));
            }
        }

        if self.url.host_str().is_none() {
            return Err(PluginError::Init(format!("url '{}' has no host", self.url)));
        }

        Ok(())
    }
}

/// State available once the pump is initialized
struct Connection {
    config: CloudLogConfig,
    client: Client,
    span: Span,
}

/// CloudLog pump - POSTs analytics batches as JSON
#[derive(Default)]
pub struct CloudLogPump {
    connection: Option<Connection>,
    timeout: u64,
}

impl CloudLogPump {
    /// Create an unconfigured pump; call [`Pump::init`] before writing
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration in use, if initialized
    pub fn config(&self) -> Option<&CloudLogConfig> {
        self.connection.as_ref().map(|c| &c.config)
    }

    async fn push_data(
        &self,
        connection: &Connection,
        cancel: &CancellationToken,
        body: Vec<u8>,
    ) -> Result<StatusCode, PluginError> {
        let mut builder = connection
            .client
            .post(connection.config.url.clone())
            .header(AUTHORIZATION, connection.config.token.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if self.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(self.timeout));
        }

        let request = builder.build().map_err(|e| {
            error!(error = %e, "Cannot create new request");
            PluginError::Request(e.to_string())
        })?;

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                error!("CloudLog request cancelled");
                return Err(PluginError::Cancelled);
            }
            result = connection.client.execute(request) => result.map_err(|e| {
                error!(url = %connection.config.url, error = %e, "Cannot post data");
                PluginError::Connection(format!(
                    "Failed to post to {}: {}",
                    connection.config.url, e
                ))
            })?,
        };

        let status = response.status();
        info!(status = status.as_u16(), "CloudLog request responded");
        Ok(status)
    }
}

#[async_trait]
impl Pump for CloudLogPump {
    fn new_instance(&self) -> Box<dyn Pump> {
        Box::new(CloudLogPump::new())
    }

    fn name(&self) -> &'static str {
        "CloudLog Pump"
    }

    fn init(&mut self, conf: &serde_json::Value) -> Result<(), PluginError> {
        let span = info_span!("pump", prefix = CLOUDLOG_PUMP_PREFIX);

        let (config, client) = span.in_scope(|| {
            let config = CloudLogConfig::from_value(conf).inspect_err(|e| {
                error!(error = %e, "Failed to decode configuration");
            })?;

            let client = Client::builder()
                .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
                .build()
                .map_err(|e| PluginError::Init(format!("Failed to build HTTP client: {e}")))?;

            info!(url = %config.url, environment = %config.environment, "Initializing CloudLog Pump");
            Ok::<_, PluginError>((config, client))
        })?;

        self.connection = Some(Connection {
            config,
            client,
            span,
        });
        Ok(())
    }

    async fn write_data(
        &self,
        cancel: &CancellationToken,
        records: &[AnalyticsRecord],
    ) -> Result<(), PluginError> {
        let connection = self.connection.as_ref().ok_or(PluginError::NotInitialized)?;

        async {
            info!(count = records.len(), "Writing records");

            let documents: Vec<Document> = records
                .iter()
                .map(|record| build_document(record, &connection.config.environment))
                .collect();
            let body = encode_envelope(&documents)?;

            if let Err(e) = self.push_data(connection, cancel, body).await {
                error!(error = %e, "Cannot log data to cloudlog");
            }

            Ok::<(), PluginError>(())
        }
        .instrument(connection.span.clone())
        .await
    }

    fn set_timeout(&mut self, timeout: u64) {
        self.timeout = timeout;
    }

    fn timeout(&self) -> u64 {
        self.timeout
    }
}
