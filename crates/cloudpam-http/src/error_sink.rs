//! Seam for an external error-tracking collaborator (e.g. Sentry). The
//! wire protocol to any such service is out of scope here — this trait is
//! the interface a real integration would implement; the bundled default
//! only logs.

use async_trait::async_trait;

#[async_trait]
pub trait SentrySink: Send + Sync {
    /// Reports a 5xx response surfaced at the HTTP edge.
    async fn capture(&self, status: u16, method: &str, path: &str);
}

/// Logs and drops. The default until a real collaborator is wired in.
pub struct NoopSentrySink;

#[async_trait]
impl SentrySink for NoopSentrySink {
    async fn capture(&self, status: u16, method: &str, path: &str) {
        tracing::debug!(status, method, path, "error sink is a no-op, dropping report");
    }
}
