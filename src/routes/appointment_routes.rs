// src/routes/appointment_routes.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    booking::{self, BookingRequest},
    error::ApiError,
    models::{AppState, Appointment},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/check-availability", get(check_availability))
        .route("/appointments/doctor/{doctor_id}", get(appointments_for_doctor))
}

/* ============================================================
   GET /appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.store.list_appointments().await?))
}

/* ============================================================
   GET /appointments/doctor/{doctor_id}
   ============================================================ */

pub async fn appointments_for_doctor(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let doctor_id = booking::parse_doctor_id(&doctor_id)?;
    Ok(Json(state.store.appointments_for_doctor(doctor_id).await?))
}

/* ============================================================
   GET /appointments/check-availability
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(rename = "doctorId")]
    pub doctor_id: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "timeSlot")]
    pub time_slot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

pub async fn check_availability(
    State(state): State<AppState>,
    WithRejection(Query(q), _): WithRejection<Query<AvailabilityQuery>, ApiError>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let (Some(doctor_id), Some(date), Some(time_slot)) = (
        q.doctor_id.filter(|s| !s.is_empty()),
        q.date.filter(|s| !s.is_empty()),
        q.time_slot.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Missing required parameters".into()));
    };

    let doctor_id = booking::parse_doctor_id(&doctor_id)?;
    let date = booking::parse_date(&date)?;
    booking::check_slot(&time_slot)?;

    let available = booking::is_available(state.store.as_ref(), doctor_id, date, &time_slot).await?;
    Ok(Json(AvailabilityResponse { available }))
}

/* ============================================================
   POST /appointments (public self-booking)
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<BookingRequest>, ApiError>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = booking::book_appointment(state.store.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}
