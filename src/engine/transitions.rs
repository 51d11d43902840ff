//! Parcel status lifecycle.
//!
//! ```text
//! pending ──> in_transit ──> arrived ──> delivered
//!    │
//!    └──> cancelled
//! ```
//!
//! Movement along the ladder must strictly increase the weight; skipping
//! ahead (`pending -> arrived`) is fine and back-fills the skipped stamps.
//! `delivered` and `cancelled` are terminal. Requesting the current status
//! is always accepted and changes nothing.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::parcel::{ParcelStatus, StageTimestamps, StampField, TimestampUpdates};

const LADDER: [ParcelStatus; 3] = [
    ParcelStatus::InTransit,
    ParcelStatus::Arrived,
    ParcelStatus::Delivered,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move parcel from {from} to {to}")]
    InvalidTransition { from: ParcelStatus, to: ParcelStatus },
}

/// Outcome of a validated transition, ready to be written in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ParcelStatus,
    pub to: ParcelStatus,
    pub stamps: TimestampUpdates,
}

impl StatusChange {
    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.stamps.is_empty()
    }

    pub fn stamped_fields(&self) -> Vec<StampField> {
        self.stamps.keys().copied().collect()
    }
}

pub fn can_transition(current: ParcelStatus, requested: ParcelStatus) -> bool {
    if current == requested {
        return true;
    }

    if current.is_terminal() {
        return false;
    }

    if requested == ParcelStatus::Cancelled {
        return current == ParcelStatus::Pending;
    }

    match (current.weight(), requested.weight()) {
        (Some(from), Some(to)) => to > from,
        _ => false,
    }
}

/// Stamps every ladder stage up to and including `requested` that is not
/// already set, plus `cancelled_at` when cancelling.
pub fn compute_timestamp_updates(
    requested: ParcelStatus,
    existing: &StageTimestamps,
    now: DateTime<Utc>,
) -> TimestampUpdates {
    let mut updates = TimestampUpdates::new();

    let unset = |field: StampField| existing.get(field).is_none();

    if let Some(target) = requested.weight() {
        for stage in LADDER {
            let reached = stage.weight().is_some_and(|w| w <= target);
            if let Some(field) = stage.stamp_field().filter(|f| reached && unset(*f)) {
                updates.insert(field, now);
            }
        }
    }

    if requested == ParcelStatus::Cancelled && unset(StampField::CancelledAt) {
        updates.insert(StampField::CancelledAt, now);
    }

    updates
}

/// Validates first, then computes stamps. Nothing is computed for a
/// rejected request.
pub fn plan_transition(
    current: ParcelStatus,
    requested: ParcelStatus,
    existing: &StageTimestamps,
    now: DateTime<Utc>,
) -> Result<StatusChange, TransitionError> {
    if !can_transition(current, requested) {
        return Err(TransitionError::InvalidTransition {
            from: current,
            to: requested,
        });
    }

    let stamps = if current == requested {
        TimestampUpdates::new()
    } else {
        compute_timestamp_updates(requested, existing, now)
    };

    Ok(StatusChange {
        from: current,
        to: requested,
        stamps,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::parcel::ParcelStatus::*;

    #[test]
    fn same_status_is_always_allowed() {
        for status in ParcelStatus::ALL {
            assert!(can_transition(status, status), "{status} -> {status}");
        }
    }

    #[test]
    fn terminal_states_reject_every_other_target() {
        for current in [Delivered, Cancelled] {
            for requested in ParcelStatus::ALL {
                if requested != current {
                    assert!(!can_transition(current, requested), "{current} -> {requested}");
                }
            }
        }
    }

    #[test]
    fn cancellation_only_from_pending() {
        assert!(can_transition(Pending, Cancelled));
        assert!(!can_transition(InTransit, Cancelled));
        assert!(!can_transition(Arrived, Cancelled));
    }

    #[test]
    fn forward_moves_and_skips_are_allowed() {
        assert!(can_transition(Pending, InTransit));
        assert!(can_transition(Pending, Arrived));
        assert!(can_transition(Pending, Delivered));
        assert!(can_transition(InTransit, Delivered));
    }

    #[test]
    fn backward_moves_are_rejected() {
        assert!(!can_transition(InTransit, Pending));
        assert!(!can_transition(Arrived, InTransit));
        assert!(!can_transition(Arrived, Pending));
    }

    #[test]
    fn arriving_from_scratch_fills_skipped_stage() {
        let now = Utc::now();
        let updates = compute_timestamp_updates(Arrived, &StageTimestamps::default(), now);

        assert_eq!(updates.get(&StampField::SentAt), Some(&now));
        assert_eq!(updates.get(&StampField::ArrivedAt), Some(&now));
        assert!(!updates.contains_key(&StampField::CollectedAt));
        assert!(!updates.contains_key(&StampField::CancelledAt));
    }

    #[test]
    fn existing_stamp_is_left_out() {
        let sent = Utc::now() - Duration::hours(5);
        let existing = StageTimestamps {
            sent_at: Some(sent),
            ..StageTimestamps::default()
        };

        let updates = compute_timestamp_updates(Arrived, &existing, Utc::now());

        assert_eq!(updates.keys().copied().collect::<Vec<_>>(), vec![StampField::ArrivedAt]);
    }

    #[test]
    fn cancelling_stamps_only_cancelled_at() {
        let updates = compute_timestamp_updates(Cancelled, &StageTimestamps::default(), Utc::now());
        assert_eq!(updates.keys().copied().collect::<Vec<_>>(), vec![StampField::CancelledAt]);
    }

    #[test]
    fn pending_stamps_nothing() {
        let updates = compute_timestamp_updates(Pending, &StageTimestamps::default(), Utc::now());
        assert!(updates.is_empty());
    }

    #[test]
    fn rejected_plan_carries_both_statuses() {
        let err = plan_transition(Arrived, InTransit, &StageTimestamps::default(), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                from: Arrived,
                to: InTransit
            }
        );
    }

    #[test]
    fn repeated_status_is_a_noop_plan() {
        let change =
            plan_transition(InTransit, InTransit, &StageTimestamps::default(), Utc::now()).unwrap();
        assert!(change.is_noop());
    }

    #[test]
    fn lifecycle_walkthrough() {
        let mut status = Pending;
        let mut stamps = StageTimestamps::default();

        let t1 = Utc::now();
        let change = plan_transition(status, InTransit, &stamps, t1).unwrap();
        assert_eq!(change.stamped_fields(), vec![StampField::SentAt]);
        stamps.apply(&change.stamps);
        status = change.to;
        assert_eq!(status, InTransit);
        assert_eq!(stamps.sent_at, Some(t1));

        assert!(plan_transition(status, Pending, &stamps, Utc::now()).is_err());
        assert_eq!(status, InTransit);

        let t2 = t1 + Duration::minutes(30);
        let change = plan_transition(status, Delivered, &stamps, t2).unwrap();
        assert_eq!(
            change.stamped_fields(),
            vec![StampField::ArrivedAt, StampField::CollectedAt]
        );
        stamps.apply(&change.stamps);
        status = change.to;
        assert_eq!(status, Delivered);
        assert_eq!(stamps.sent_at, Some(t1));
        assert_eq!(stamps.arrived_at, Some(t2));
        assert_eq!(stamps.collected_at, Some(t2));

        let err = plan_transition(status, Cancelled, &stamps, Utc::now()).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(stamps.cancelled_at, None);
    }
}
