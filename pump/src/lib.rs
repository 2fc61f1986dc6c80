//! CloudLog pump - analytics export connector
//!
//! Takes batches of API gateway analytics records, flattens each record into a
//! key-value document and POSTs the batch to a CloudLog ingestion endpoint.
//!
//! # Architecture
//!
//! ```text
//! AnalyticsRecord batch ──► document transform ──► {"records": [...]} ──► HTTP POST
//! ```
//!
//! Connectors implement the [`Pump`] trait and are created through the
//! [`PumpRegistry`].

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod analytics;
pub mod config;
pub mod document;
pub mod error;
pub mod feed;
pub mod pump;
pub mod registry;

pub use analytics::{AnalyticsRecord, decode_batch, decode_lines};
pub use config::Config;
pub use document::{Document, build_document, encode_envelope};
pub use error::{PluginError, PumpError, Result};
pub use feed::{FeedSummary, run_feed};
pub use pump::{CloudLogConfig, CloudLogPump, Pump};
pub use registry::PumpRegistry;
