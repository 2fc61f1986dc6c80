//! Pump system
//!
//! A pump is an output connector: it takes batches of analytics records and
//! forwards them to one external sink. Pumps are created from a registered
//! prototype, initialized with their own opaque configuration, then written to
//! once per batch.

pub mod cloudlog;

use crate::analytics::AnalyticsRecord;
use crate::error::PluginError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use cloudlog::{CloudLogConfig, CloudLogPump};

/// Pump trait - lifecycle contract shared by all output connectors
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct MySinkPump {
///     client: Option<MySinkClient>,
///     timeout: u64,
/// }
///
/// #[async_trait]
/// impl Pump for MySinkPump {
///     fn new_instance(&self) -> Box<dyn Pump> { Box::new(MySinkPump::default()) }
///     fn name(&self) -> &'static str { "My Sink Pump" }
///
///     fn init(&mut self, conf: &serde_json::Value) -> Result<(), PluginError> {
///         self.client = Some(MySinkClient::from_config(conf)?);
///         Ok(())
///     }
///
///     async fn write_data(
///         &self,
///         cancel: &CancellationToken,
///         records: &[AnalyticsRecord],
///     ) -> Result<(), PluginError> {
///         self.client.as_ref().ok_or(PluginError::NotInitialized)?.send(records).await
///     }
///
///     fn set_timeout(&mut self, timeout: u64) { self.timeout = timeout; }
///     fn timeout(&self) -> u64 { self.timeout }
/// }
/// ```
#[async_trait]
pub trait Pump: Send + Sync {
    /// Create a fresh, unconfigured pump of the same kind
    fn new_instance(&self) -> Box<dyn Pump>;

    /// Human-readable pump name for identification and logging
    fn name(&self) -> &'static str;

    /// Decode and validate configuration, preparing the pump for writes
    ///
    /// # Errors
    /// Returns `PluginError::Init` if the configuration is malformed
    fn init(&mut self, conf: &serde_json::Value) -> Result<(), PluginError>;

    /// Write one batch of records
    ///
    /// `cancel` aborts any in-flight delivery when triggered.
    async fn write_data(
        &self,
        cancel: &CancellationToken,
        records: &[AnalyticsRecord],
    ) -> Result<(), PluginError>;

    /// Set the delivery timeout in seconds (`0` disables it)
    fn set_timeout(&mut self, timeout: u64);

    /// Delivery timeout in seconds
    fn timeout(&self) -> u64;
}
