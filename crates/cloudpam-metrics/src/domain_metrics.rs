//! Domain-event counters: pool lifecycle, discovery ingest, and
//! recommendation lifecycle, each broken down by an `action` or `outcome`
//! label rather than one metric per variant.

use anyhow::Result;
use prometheus::{IntCounterVec, Opts, Registry};

pub struct DomainMetrics {
    pool_mutations_total: IntCounterVec,
    ingest_resources_total: IntCounterVec,
    recommendations_total: IntCounterVec,
    agent_registrations_total: IntCounterVec,
}

impl DomainMetrics {
    pub(crate) fn register(registry: &Registry, namespace: &str) -> Result<Self> {
        let pool_mutations_total = IntCounterVec::new(
            Opts::new("pool_mutations_total", "Pool create/update/delete operations").namespace(namespace),
            &["action"],
        )?;
        let ingest_resources_total = IntCounterVec::new(
            Opts::new("ingest_resources_total", "Discovered resources processed by ingest, by outcome").namespace(namespace),
            &["outcome"],
        )?;
        let recommendations_total = IntCounterVec::new(
            Opts::new("recommendations_total", "Recommendations generated or resolved, by type and outcome").namespace(namespace),
            &["recommendation_type", "outcome"],
        )?;
        let agent_registrations_total = IntCounterVec::new(
            Opts::new("agent_registrations_total", "Discovery agent registrations, by approval status").namespace(namespace),
            &["approval_status"],
        )?;

        registry.register(Box::new(pool_mutations_total.clone()))?;
        registry.register(Box::new(ingest_resources_total.clone()))?;
        registry.register(Box::new(recommendations_total.clone()))?;
        registry.register(Box::new(agent_registrations_total.clone()))?;

        Ok(Self { pool_mutations_total, ingest_resources_total, recommendations_total, agent_registrations_total })
    }

    pub fn record_pool_mutation(&self, action: &str) {
        self.pool_mutations_total.with_label_values(&[action]).inc();
    }

    pub fn record_ingest_outcome(&self, outcome: &str, count: u64) {
        self.ingest_resources_total.with_label_values(&[outcome]).inc_by(count);
    }

    pub fn record_recommendation(&self, recommendation_type: &str, outcome: &str) {
        self.recommendations_total.with_label_values(&[recommendation_type, outcome]).inc();
    }

    pub fn record_agent_registration(&self, approval_status: &str) {
        self.agent_registrations_total.with_label_values(&[approval_status]).inc();
    }
}
