use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::models::parcel::ParcelStatus;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub status_transitions_total: IntCounterVec,
    pub parcels_registered_total: IntCounter,
    pub parcels_by_status: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Parcel status update requests by outcome",
            ),
            &["outcome"],
        )
        .expect("valid status_transitions_total metric");

        let parcels_registered_total =
            IntCounter::new("parcels_registered_total", "Total parcels registered")
                .expect("valid parcels_registered_total metric");

        let parcels_by_status = IntGaugeVec::new(
            Opts::new("parcels_by_status", "Current number of parcels per status"),
            &["status"],
        )
        .expect("valid parcels_by_status metric");

        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(parcels_registered_total.clone()))
            .expect("register parcels_registered_total");
        registry
            .register(Box::new(parcels_by_status.clone()))
            .expect("register parcels_by_status");

        for status in ParcelStatus::ALL {
            parcels_by_status.with_label_values(&[status.as_str()]).set(0);
        }

        Self {
            registry,
            status_transitions_total,
            parcels_registered_total,
            parcels_by_status,
        }
    }

    pub fn record_registered(&self) {
        self.parcels_registered_total.inc();
        self.parcels_by_status
            .with_label_values(&[ParcelStatus::Pending.as_str()])
            .inc();
    }

    pub fn record_moved(&self, from: ParcelStatus, to: ParcelStatus) {
        self.parcels_by_status
            .with_label_values(&[from.as_str()])
            .dec();
        self.parcels_by_status.with_label_values(&[to.as_str()]).inc();
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.status_transitions_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|err| AppError::Internal(format!("metrics encoding: {err}")))?;

        String::from_utf8(buffer).map_err(|err| AppError::Internal(format!("metrics encoding: {err}")))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
