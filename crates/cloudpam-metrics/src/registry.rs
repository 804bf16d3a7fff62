//! Registry construction. Unlike a process-wide `LazyLock`, metric names
//! here are namespaced at construction time from configuration, so
//! `Metrics::new` takes the configured namespace rather than baking one
//! in at compile time.

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use crate::domain_metrics::DomainMetrics;
use crate::http_metrics::HttpMetrics;

pub struct Metrics {
    registry: Registry,
    pub http: HttpMetrics,
    pub domain: DomainMetrics,
}

impl Metrics {
    /// `namespace` prefixes every metric name, e.g. `cloudpam_http_requests_total`.
    pub fn new(namespace: &str) -> Result<Self> {
        let registry = Registry::new();
        let http = HttpMetrics::register(&registry, namespace)?;
        let domain = DomainMetrics::register(&registry, namespace)?;
        Ok(Self { registry, http, domain })
    }

    /// Renders the registry in Prometheus text exposition format, for the
    /// `/metrics` endpoint.
    pub fn gather(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_includes_registered_metric_names() {
        let metrics = Metrics::new("cloudpam_test").unwrap();
        metrics.http.record_request("GET", "/pools", 200, 0.01);
        let text = metrics.gather().unwrap();
        assert!(text.contains("cloudpam_test_http_requests_total"));
    }
}
