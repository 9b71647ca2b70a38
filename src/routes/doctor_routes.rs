// src/routes/doctor_routes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AdminContext,
    models::{AppState, Doctor, DoctorPatch, NewDoctor, TIME_SLOTS},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route("/doctors/{id}", get(get_doctor))
        .route("/slots", get(list_slots))
}

#[derive(Debug, Deserialize)]
pub struct DoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub image: Option<String>,
    pub available_days: Option<Vec<i32>>,
}

fn validate_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ApiError::BadRequest(format!("The {field} field is required."))),
    }
}

/// Weekdays 0..=6 (Sunday = 0), returned sorted and de-duplicated.
pub fn validate_available_days(days: Vec<i32>) -> Result<Vec<i32>, ApiError> {
    if days.iter().any(|d| !(0..=6).contains(d)) {
        return Err(ApiError::BadRequest(
            "The available days must be weekdays between 0 and 6.".into(),
        ));
    }
    let mut days = days;
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

impl DoctorRequest {
    pub fn into_new(self) -> Result<NewDoctor, ApiError> {
        let name = validate_text(self.name, "name")?;
        let specialty = validate_text(self.specialty, "specialty")?;
        let image = validate_text(self.image, "image")?;
        let available_days = match self.available_days {
            Some(days) => validate_available_days(days)?,
            None => {
                return Err(ApiError::BadRequest(
                    "The available days field is required.".into(),
                ))
            }
        };
        Ok(NewDoctor {
            name,
            specialty,
            image,
            available_days,
        })
    }

    /// Fields present in the body must still be valid; absent ones are kept.
    pub fn into_patch(self) -> Result<DoctorPatch, ApiError> {
        Ok(DoctorPatch {
            name: self.name.map(|v| validate_text(Some(v), "name")).transpose()?,
            specialty: self
                .specialty
                .map(|v| validate_text(Some(v), "specialty"))
                .transpose()?,
            image: self.image.map(|v| validate_text(Some(v), "image")).transpose()?,
            available_days: self
                .available_days
                .map(validate_available_days)
                .transpose()?,
        })
    }
}

/// Unparseable ids cannot name a row, so they read as not found.
pub fn parse_path_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(not_found.to_string()))
}

pub async fn list_doctors(State(state): State<AppState>) -> Result<Json<Vec<Doctor>>, ApiError> {
    Ok(Json(state.store.list_doctors().await?))
}

pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Doctor>, ApiError> {
    let id = parse_path_id(&id, "Doctor not found")?;
    let doctor = state
        .store
        .get_doctor(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Doctor not found".into()))?;
    Ok(Json(doctor))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    WithRejection(Json(req), _): WithRejection<Json<DoctorRequest>, ApiError>,
) -> Result<(StatusCode, Json<Doctor>), ApiError> {
    let new = req.into_new()?;
    let doctor = state.store.create_doctor(new).await?;
    tracing::info!(doctor_id = %doctor.id, by = %auth.username, "doctor created");
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub async fn list_slots() -> Json<Vec<&'static str>> {
    Json(TIME_SLOTS.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> DoctorRequest {
        DoctorRequest {
            name: Some("Dr. Emily Watson".into()),
            specialty: Some("Pediatrician".into()),
            image: Some("/storage/doctors/emily.jpg".into()),
            available_days: Some(vec![6, 2, 4, 2]),
        }
    }

    #[test]
    fn new_doctor_normalizes_days() {
        let d = full().into_new().unwrap();
        assert_eq!(d.available_days, vec![2, 4, 6]);
    }

    #[test]
    fn new_doctor_rejects_missing_or_bad_fields() {
        let mut r = full();
        r.specialty = Some(" ".into());
        assert!(r.into_new().is_err());

        let mut r = full();
        r.available_days = None;
        assert!(r.into_new().is_err());

        let mut r = full();
        r.available_days = Some(vec![7]);
        assert!(r.into_new().is_err());
    }

    #[test]
    fn patch_keeps_absent_fields_untouched() {
        let p = DoctorRequest {
            name: None,
            specialty: Some("Cardiology".into()),
            image: None,
            available_days: None,
        }
        .into_patch()
        .unwrap();
        assert!(p.name.is_none());
        assert_eq!(p.specialty.as_deref(), Some("Cardiology"));

        let bad = DoctorRequest {
            name: Some("".into()),
            specialty: None,
            image: None,
            available_days: None,
        };
        assert!(bad.into_patch().is_err());
    }
}
