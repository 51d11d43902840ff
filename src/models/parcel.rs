use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    Pending,
    InTransit,
    Arrived,
    Delivered,
    Cancelled,
}

impl ParcelStatus {
    pub const ALL: [ParcelStatus; 5] = [
        ParcelStatus::Pending,
        ParcelStatus::InTransit,
        ParcelStatus::Arrived,
        ParcelStatus::Delivered,
        ParcelStatus::Cancelled,
    ];

    /// Position on the delivery ladder. `Cancelled` sits outside it.
    pub const fn weight(self) -> Option<u8> {
        match self {
            ParcelStatus::Pending => Some(0),
            ParcelStatus::InTransit => Some(1),
            ParcelStatus::Arrived => Some(2),
            ParcelStatus::Delivered => Some(3),
            ParcelStatus::Cancelled => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ParcelStatus::Delivered | ParcelStatus::Cancelled)
    }

    /// The stamp written when a parcel enters this status, if any.
    pub const fn stamp_field(self) -> Option<StampField> {
        match self {
            ParcelStatus::Pending => None,
            ParcelStatus::InTransit => Some(StampField::SentAt),
            ParcelStatus::Arrived => Some(StampField::ArrivedAt),
            ParcelStatus::Delivered => Some(StampField::CollectedAt),
            ParcelStatus::Cancelled => Some(StampField::CancelledAt),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ParcelStatus::Pending => "pending",
            ParcelStatus::InTransit => "in_transit",
            ParcelStatus::Arrived => "arrived",
            ParcelStatus::Delivered => "delivered",
            ParcelStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parcel status: {0}, expected pending/in_transit/arrived/delivered/cancelled")]
pub struct ParseStatusError(pub String);

impl FromStr for ParcelStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParcelStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StampField {
    SentAt,
    ArrivedAt,
    CollectedAt,
    CancelledAt,
}

/// Sparse set of stamps to write; fields already set on the parcel are absent.
pub type TimestampUpdates = BTreeMap<StampField, DateTime<Utc>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageTimestamps {
    pub sent_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl StageTimestamps {
    pub fn get(&self, field: StampField) -> Option<DateTime<Utc>> {
        match field {
            StampField::SentAt => self.sent_at,
            StampField::ArrivedAt => self.arrived_at,
            StampField::CollectedAt => self.collected_at,
            StampField::CancelledAt => self.cancelled_at,
        }
    }

    fn slot(&mut self, field: StampField) -> &mut Option<DateTime<Utc>> {
        match field {
            StampField::SentAt => &mut self.sent_at,
            StampField::ArrivedAt => &mut self.arrived_at,
            StampField::CollectedAt => &mut self.collected_at,
            StampField::CancelledAt => &mut self.cancelled_at,
        }
    }

    /// Merges `updates` in. A stamp that is already set is kept.
    pub fn apply(&mut self, updates: &TimestampUpdates) {
        for (field, at) in updates {
            self.slot(*field).get_or_insert(*at);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_code: String,
    pub sender: Contact,
    pub recipient: Contact,
    pub description: String,
    pub price: f64,
    pub origin_station_id: Uuid,
    pub destination_station_id: Uuid,
    pub status: ParcelStatus,
    pub timestamps: StageTimestamps,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn tracking_code_for(id: Uuid) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("COL-{}", &hex[..8])
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn parses_every_snake_case_spelling() {
        for status in ParcelStatus::ALL {
            assert_eq!(status.as_str().parse::<ParcelStatus>(), Ok(status));
        }
    }

    #[test]
    fn rejects_unknown_status_text() {
        assert!("shipped".parse::<ParcelStatus>().is_err());
        assert!("Pending".parse::<ParcelStatus>().is_err());
        assert!("".parse::<ParcelStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ParcelStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
    }

    #[test]
    fn apply_never_overwrites_a_set_stamp() {
        let earlier = Utc::now() - Duration::hours(3);
        let now = Utc::now();

        let mut stamps = StageTimestamps {
            sent_at: Some(earlier),
            ..StageTimestamps::default()
        };

        let mut updates = TimestampUpdates::new();
        updates.insert(StampField::SentAt, now);
        updates.insert(StampField::ArrivedAt, now);
        stamps.apply(&updates);

        assert_eq!(stamps.sent_at, Some(earlier));
        assert_eq!(stamps.arrived_at, Some(now));
        assert_eq!(stamps.collected_at, None);
    }

    #[test]
    fn tracking_code_has_prefix_and_eight_hex_chars() {
        let code = tracking_code_for(Uuid::new_v4());
        assert!(code.starts_with("COL-"));
        assert_eq!(code.len(), 12);
        assert!(code[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
