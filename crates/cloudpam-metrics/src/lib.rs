//! Prometheus metrics for CloudPAM, organized by responsibility.
//!
//! - `registry` — registry construction and text-format rendering
//! - `http_metrics` — per-request counters and latency histograms
//! - `domain_metrics` — pool/ingest/recommendation/discovery event counters

pub mod domain_metrics;
pub mod http_metrics;
pub mod registry;

pub use domain_metrics::DomainMetrics;
pub use http_metrics::HttpMetrics;
pub use registry::Metrics;
