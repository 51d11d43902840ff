use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::event::StatusEvent;
use crate::models::parcel::{Parcel, tracking_code_for};
use crate::models::station::Station;
use crate::observability::metrics::Metrics;

const TRACKING_CODE_ATTEMPTS: usize = 16;

pub struct AppState {
    pub stations: DashMap<Uuid, Station>,
    pub parcels: DashMap<Uuid, Parcel>,
    pub tracking_index: DashMap<String, Uuid>,
    pub status_events_tx: broadcast::Sender<StatusEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (status_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            stations: DashMap::new(),
            parcels: DashMap::new(),
            tracking_index: DashMap::new(),
            status_events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Draws ids from `next_id` until one maps to an unused tracking code,
    /// and reserves that code for it.
    pub fn claim_tracking_code(
        &self,
        mut next_id: impl FnMut() -> Uuid,
    ) -> Result<(Uuid, String), AppError> {
        for _ in 0..TRACKING_CODE_ATTEMPTS {
            let id = next_id();
            let code = tracking_code_for(id);

            match self.tracking_index.entry(code) {
                Entry::Occupied(entry) => {
                    tracing::debug!(tracking_code = %entry.key(), "tracking code taken; drawing again");
                }
                Entry::Vacant(entry) => {
                    let code = entry.key().clone();
                    entry.insert(id);
                    return Ok((id, code));
                }
            }
        }

        Err(AppError::Internal(
            "could not allocate a free tracking code".to_string(),
        ))
    }
}
