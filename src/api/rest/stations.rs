use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{patch, post};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::station::{Station, StationStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stations", post(create_station).get(list_stations))
        .route("/stations/:id/status", patch(update_station_status))
}

#[derive(Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub city: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: StationStatus,
}

async fn create_station(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStationRequest>,
) -> Result<Json<Station>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.city.trim().is_empty() {
        return Err(AppError::BadRequest("city cannot be empty".to_string()));
    }

    let station = Station {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        city: payload.city.trim().to_string(),
        status: StationStatus::Active,
        updated_at: Utc::now(),
    };

    state.stations.insert(station.id, station.clone());
    tracing::info!(station_id = %station.id, name = %station.name, "station created");

    Ok(Json(station))
}

async fn list_stations(State(state): State<Arc<AppState>>) -> Json<Vec<Station>> {
    let stations = state
        .stations
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(stations)
}

async fn update_station_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Station>, AppError> {
    let mut station = state
        .stations
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("station {id} not found")))?;

    station.status = payload.status;
    station.updated_at = Utc::now();

    Ok(Json(station.clone()))
}
