//! Pump registry
//!
//! Maps pump kinds to prototypes so independent instances can be created per
//! configured pump, and fans each batch out to every active pump.

use crate::analytics::AnalyticsRecord;
use crate::error::PluginError;
use crate::pump::{CloudLogPump, Pump};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Registry for pump kinds and active pumps
///
/// Typically populated at startup and then used read-only during operation.
pub struct PumpRegistry {
    /// Prototypes keyed by kind, used only to create fresh instances
    prototypes: HashMap<String, Box<dyn Pump>>,
    /// Configured pumps (fan-out to all)
    pumps: Vec<Box<dyn Pump>>,
}

impl PumpRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            prototypes: HashMap::new(),
            pumps: Vec::new(),
        }
    }

    /// Create a registry with the built-in pump kinds registered
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("cloudlog", Box::new(CloudLogPump::new()));
        registry
    }

    /// Register a pump kind
    pub fn register(&mut self, kind: impl Into<String>, prototype: Box<dyn Pump>) {
        let kind = kind.into();
        info!(kind = %kind, pump = prototype.name(), "Registered pump kind");
        self.prototypes.insert(kind, prototype);
    }

    /// Check if a pump kind is registered
    pub fn has_kind(&self, kind: &str) -> bool {
        self.prototypes.contains_key(kind)
    }

    /// Get the number of active pumps
    pub fn pump_count(&self) -> usize {
        self.pumps.len()
    }

    /// Create and initialize a new pump of the given kind
    ///
    /// # Errors
    /// Returns `PluginError::Init` if the kind is unknown or its configuration
    /// is rejected
    pub fn create(
        &self,
        kind: &str,
        conf: &serde_json::Value,
        timeout: u64,
    ) -> Result<Box<dyn Pump>, PluginError> {
        let prototype = self
            .prototypes
            .get(kind)
            .ok_or_else(|| PluginError::Init(format!("No pump registered for kind '{kind}'")))?;

        let mut pump = prototype.new_instance();
        pump.init(conf)?;
        pump.set_timeout(timeout);

        debug!(kind = %kind, pump = pump.name(), timeout, "Created pump");
        Ok(pump)
    }

    /// Create a pump and add it to the active set
    pub fn add(
        &mut self,
        kind: &str,
        conf: &serde_json::Value,
        timeout: u64,
    ) -> Result<(), PluginError> {
        let pump = self.create(kind, conf, timeout)?;
        info!(kind = %kind, pump = pump.name(), "Activated pump");
        self.pumps.push(pump);
        Ok(())
    }

    /// Write a batch to every active pump
    ///
    /// Failures are logged but don't stop delivery to other pumps.
    ///
    /// Returns the number of pumps that accepted the batch.
    pub async fn write_to_all(
        &self,
        cancel: &CancellationToken,
        records: &[AnalyticsRecord],
    ) -> usize {
        if self.pumps.is_empty() {
            warn!("No pumps configured, records will be dropped");
            return 0;
        }

        let mut success_count = 0;

        for pump in &self.pumps {
            match pump.write_data(cancel, records).await {
                Ok(()) => {
                    debug!(pump = pump.name(), count = records.len(), "Batch written");
                    success_count += 1;
                }
                Err(e) => {
                    error!(
                        pump = pump.name(),
                        error = %e,
                        count = records.len(),
                        "Failed to write batch"
                    );
                }
            }
        }

        success_count
    }
}

impl Default for PumpRegistry {
    fn default() -> Self {
        Self::new()
    }
}
