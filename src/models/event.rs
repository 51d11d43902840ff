use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::parcel::{ParcelStatus, StampField};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub parcel_id: Uuid,
    pub tracking_code: String,
    pub from: ParcelStatus,
    pub to: ParcelStatus,
    pub stamped: Vec<StampField>,
    pub changed_at: DateTime<Utc>,
}
