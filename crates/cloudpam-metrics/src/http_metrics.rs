//! Per-request HTTP metrics: count by method/path/status, latency
//! histogram by method/path.

use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

pub struct HttpMetrics {
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
}

impl HttpMetrics {
    pub(crate) fn register(registry: &Registry, namespace: &str) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled").namespace(namespace),
            &["method", "path", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request latency in seconds")
                .namespace(namespace)
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self { requests_total, request_duration_seconds })
    }

    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_seconds: f64) {
        self.requests_total.with_label_values(&[method, path, &status.to_string()]).inc();
        self.request_duration_seconds.with_label_values(&[method, path]).observe(duration_seconds);
    }
}
