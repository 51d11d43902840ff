use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::transitions::plan_transition;
use crate::error::AppError;
use crate::models::event::StatusEvent;
use crate::models::parcel::{Contact, Parcel, ParcelStatus, StageTimestamps};
use crate::models::station::StationStatus;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", post(create_parcel).get(list_parcels))
        .route("/parcels/:id", get(get_parcel))
        .route("/parcels/:id/status", patch(update_parcel_status))
        .route("/tracking/:code", get(track_parcel))
}

#[derive(Deserialize)]
pub struct CreateParcelRequest {
    pub sender: Contact,
    pub recipient: Contact,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub origin_station_id: Uuid,
    pub destination_station_id: Uuid,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ListParcelsQuery {
    pub status: Option<String>,
}

fn ensure_active_station(state: &AppState, id: Uuid, role: &str) -> Result<(), AppError> {
    let station = state
        .stations
        .get(&id)
        .ok_or_else(|| AppError::BadRequest(format!("{role} station {id} does not exist")))?;

    if station.status != StationStatus::Active {
        return Err(AppError::BadRequest(format!(
            "{role} station {id} is not active"
        )));
    }

    Ok(())
}

async fn create_parcel(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateParcelRequest>, JsonRejection>,
) -> Result<Json<Parcel>, AppError> {
    let Json(payload) = payload?;

    if payload.sender.name.trim().is_empty() {
        return Err(AppError::BadRequest("sender name cannot be empty".to_string()));
    }

    if payload.recipient.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "recipient name cannot be empty".to_string(),
        ));
    }

    if !payload.price.is_finite() || payload.price < 0.0 {
        return Err(AppError::BadRequest("price must be >= 0".to_string()));
    }

    if payload.origin_station_id == payload.destination_station_id {
        return Err(AppError::BadRequest(
            "origin and destination stations must differ".to_string(),
        ));
    }

    ensure_active_station(&state, payload.origin_station_id, "origin")?;
    ensure_active_station(&state, payload.destination_station_id, "destination")?;

    let (id, tracking_code) = state.claim_tracking_code(Uuid::new_v4)?;
    let now = Utc::now();
    let parcel = Parcel {
        id,
        tracking_code,
        sender: payload.sender,
        recipient: payload.recipient,
        description: payload.description,
        price: payload.price,
        origin_station_id: payload.origin_station_id,
        destination_station_id: payload.destination_station_id,
        status: ParcelStatus::Pending,
        timestamps: StageTimestamps {
            sent_at: Some(payload.sent_at.unwrap_or(now)),
            ..StageTimestamps::default()
        },
        created_at: now,
        updated_at: now,
    };

    state.parcels.insert(parcel.id, parcel.clone());
    state.metrics.record_registered();

    info!(
        parcel_id = %parcel.id,
        tracking_code = %parcel.tracking_code,
        "parcel registered"
    );

    Ok(Json(parcel))
}

async fn list_parcels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let filter = query
        .status
        .as_deref()
        .map(str::parse::<ParcelStatus>)
        .transpose()?;

    let mut parcels: Vec<Parcel> = state
        .parcels
        .iter()
        .filter(|entry| filter.is_none_or(|status| entry.value().status == status))
        .map(|entry| entry.value().clone())
        .collect();
    parcels.sort_by_key(|parcel| parcel.created_at);

    Ok(Json(parcels))
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Parcel>, AppError> {
    let parcel = state
        .parcels
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {id} not found")))?;

    Ok(Json(parcel.value().clone()))
}

async fn track_parcel(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id = state
        .tracking_index
        .get(&code.to_uppercase())
        .map(|entry| *entry.value())
        .ok_or_else(|| AppError::NotFound(format!("tracking code {code} not found")))?;

    let parcel = state
        .parcels
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("parcel {id} not found")))?;

    Ok(Json(parcel.value().clone()))
}

async fn update_parcel_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Parcel>, AppError> {
    let Json(payload) = payload?;
    let requested: ParcelStatus = payload.status.parse()?;

    // The entry guard is held across check and write so concurrent updates
    // to the same parcel serialize.
    let (updated, event) = {
        let mut parcel = state
            .parcels
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("parcel {id} not found")))?;

        let now = Utc::now();
        let change = match plan_transition(parcel.status, requested, &parcel.timestamps, now) {
            Ok(change) => change,
            Err(err) => {
                state.metrics.record_outcome("rejected");
                warn!(parcel_id = %id, from = %parcel.status, to = %requested, "status change rejected");
                return Err(err.into());
            }
        };

        if change.is_noop() {
            state.metrics.record_outcome("noop");
            (parcel.clone(), None)
        } else {
            parcel.timestamps.apply(&change.stamps);
            parcel.status = change.to;
            parcel.updated_at = now;

            state.metrics.record_outcome("applied");
            state.metrics.record_moved(change.from, change.to);

            let event = StatusEvent {
                parcel_id: parcel.id,
                tracking_code: parcel.tracking_code.clone(),
                from: change.from,
                to: change.to,
                stamped: change.stamped_fields(),
                changed_at: now,
            };
            (parcel.clone(), Some(event))
        }
    };

    if let Some(event) = event {
        info!(
            parcel_id = %event.parcel_id,
            from = %event.from,
            to = %event.to,
            stamped = event.stamped.len(),
            "parcel status changed"
        );
        let _ = state.status_events_tx.send(event);
    }

    Ok(Json(updated))
}
