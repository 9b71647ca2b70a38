// src/routes/admin_routes.rs

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    auth::hash_password,
    booking::{self, BookingRequest},
    error::ApiError,
    middleware::auth_context::{AdminContext, AuthContext},
    models::{
        AppState, Appointment, AppointmentWithDoctor, Doctor, MessageResponse, NewStaff,
        StaffProfile, StaffRole, StaffUpdate,
    },
    routes::doctor_routes::{self, parse_path_id, DoctorRequest},
};

pub fn router() -> Router<AppState> {
    Router::new()
        // /admin/doctors
        .route("/doctors", get(list_doctors).post(doctor_routes::create_doctor))
        .route("/doctors/{id}", put(update_doctor).delete(delete_doctor))
        // /admin/appointments
        .route("/appointments", get(list_appointments).post(create_appointment_for_patient))
        // /admin/staff
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/{id}", put(update_staff).delete(delete_staff))
}

/* ============================================================
   Doctors
   ============================================================ */

pub async fn list_doctors(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    Ok(Json(state.store.list_doctors().await?))
}

pub async fn update_doctor(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<DoctorRequest>, ApiError>,
) -> Result<Json<Doctor>, ApiError> {
    let id = parse_path_id(&id, "Doctor not found")?;
    let patch = req.into_patch()?;

    let doctor = state
        .store
        .update_doctor(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Doctor not found".into()))?;

    tracing::info!(doctor_id = %doctor.id, by = %auth.username, "doctor updated");
    Ok(Json(doctor))
}

pub async fn delete_doctor(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_path_id(&id, "Doctor not found")?;
    if !state.store.delete_doctor(id).await? {
        return Err(ApiError::NotFound("Doctor not found".into()));
    }

    tracing::info!(doctor_id = %id, by = %auth.username, "doctor deleted with its appointments");
    Ok(Json(MessageResponse::new("Doctor deleted successfully")))
}

/* ============================================================
   Appointments
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Result<Json<Vec<AppointmentWithDoctor>>, ApiError> {
    let doctors: HashMap<_, _> = state
        .store
        .list_doctors()
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let rows = state
        .store
        .list_appointments()
        .await?
        .into_iter()
        .map(|appointment| AppointmentWithDoctor {
            doctor: doctors.get(&appointment.doctor_id).cloned(),
            appointment,
        })
        .collect();

    Ok(Json(rows))
}

/// Staff-assisted booking. Same rules as the public booking flow.
pub async fn create_appointment_for_patient(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<BookingRequest>, ApiError>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = booking::book_appointment(state.store.as_ref(), req).await?;
    tracing::info!(appointment_id = %appointment.id, by = %auth.username, "booked by staff");
    Ok((StatusCode::CREATED, Json(appointment)))
}

/* ============================================================
   Staff
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct StaffRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

fn validate_name(name: &str) -> Result<String, ApiError> {
    let n = name.trim();
    if n.is_empty() {
        return Err(ApiError::BadRequest("The name field is required.".into()));
    }
    Ok(n.to_string())
}

fn validate_email(email: &str) -> Result<String, ApiError> {
    let e = email.trim();
    let valid = match e.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !e.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::BadRequest(
            "The email field must be a valid email address.".into(),
        ));
    }
    Ok(e.to_string())
}

fn validate_phone(phone: &str) -> Result<String, ApiError> {
    let p = phone.trim();
    if p.is_empty() {
        return Err(ApiError::BadRequest("The phone field is required.".into()));
    }
    Ok(p.to_string())
}

/// Staff accounts are never created or promoted to admin through the API.
fn validate_role(role: &str) -> Result<StaffRole, ApiError> {
    match role.parse::<StaffRole>() {
        Ok(r) if !r.is_admin() => Ok(r),
        _ => Err(ApiError::BadRequest("The selected role is invalid.".into())),
    }
}

fn validate_password(pw: &str) -> Result<(), ApiError> {
    if pw.chars().count() < 6 {
        return Err(ApiError::BadRequest(
            "The password field must be at least 6 characters.".into(),
        ));
    }
    Ok(())
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest(format!("The {field} field is required.")))
}

pub async fn list_staff(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<Vec<StaffProfile>>, ApiError> {
    let staff = state.store.list_staff_members().await?;
    Ok(Json(staff.iter().map(StaffProfile::from).collect()))
}

pub async fn create_staff(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    WithRejection(Json(req), _): WithRejection<Json<StaffRequest>, ApiError>,
) -> Result<(StatusCode, Json<StaffProfile>), ApiError> {
    let name = validate_name(required(&req.name, "name")?)?;
    let email = validate_email(required(&req.email, "email")?)?;
    let phone = validate_phone(required(&req.phone, "phone")?)?;
    let role = validate_role(required(&req.role, "role")?)?;
    let password = required(&req.password, "password")?;
    validate_password(password)?;

    let password_hash = hash_password(password).map_err(ApiError::Internal)?;

    let staff = state
        .store
        .create_staff(NewStaff {
            username: name.clone(),
            name: Some(name),
            email: Some(email),
            phone: Some(phone),
            password_hash,
            role,
        })
        .await?;

    tracing::info!(staff_id = %staff.id, role = %staff.role, by = %auth.username, "staff created");
    Ok((StatusCode::CREATED, Json(StaffProfile::from(&staff))))
}

pub async fn update_staff(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    Path(id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<StaffRequest>, ApiError>,
) -> Result<Json<StaffProfile>, ApiError> {
    let id = parse_path_id(&id, "Staff not found")?;

    let password_hash = match req.password.as_deref() {
        Some(pw) if !pw.is_empty() => {
            validate_password(pw)?;
            Some(hash_password(pw).map_err(ApiError::Internal)?)
        }
        _ => None,
    };

    let update = StaffUpdate {
        name: req.name.as_deref().map(validate_name).transpose()?,
        email: req.email.as_deref().map(validate_email).transpose()?,
        phone: req.phone.as_deref().map(validate_phone).transpose()?,
        role: req.role.as_deref().map(validate_role).transpose()?,
        password_hash,
    };

    let staff = state
        .store
        .update_staff(id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Staff not found".into()))?;

    tracing::info!(staff_id = %staff.id, by = %auth.username, "staff updated");
    Ok(Json(StaffProfile::from(&staff)))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    AdminContext(auth): AdminContext,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_path_id(&id, "Staff not found")?;
    if !state.store.delete_staff(id).await? {
        return Err(ApiError::NotFound("Staff not found".into()));
    }

    tracing::info!(staff_id = %id, by = %auth.username, "staff deleted");
    Ok(Json(MessageResponse::new("Staff deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_role() {
        assert_eq!(validate_role("nurse").unwrap(), StaffRole::Nurse);
        assert_eq!(validate_role("receptionist").unwrap(), StaffRole::Receptionist);
        assert!(validate_role("admin").is_err());
        assert!(validate_role("doctor").is_err());
        assert!(validate_role("").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("desk@clinic.test").is_ok());
        assert!(validate_email("  desk@clinic.test ").is_ok());
        assert!(validate_email("desk").is_err());
        assert!(validate_email("@clinic.test").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("a b@c.d").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Nina ").unwrap(), "Nina");
        assert!(validate_name("   ").is_err());
    }
}
