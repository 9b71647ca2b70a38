use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::Store;
use crate::middleware::auth_context::CredentialResolver;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub resolver: CredentialResolver,
}

/* -------------------------
   Time slots
--------------------------*/

/// Bookable slot labels, in day order.
pub const TIME_SLOTS: [&str; 14] = [
    "09:00 AM", "09:30 AM", "10:00 AM", "10:30 AM",
    "11:00 AM", "11:30 AM", "01:00 PM", "01:30 PM",
    "02:00 PM", "02:30 PM", "03:00 PM", "03:30 PM",
    "04:00 PM", "04:30 PM",
];

/// Position of a slot label within the day, `None` for unknown labels.
pub fn slot_position(label: &str) -> Option<usize> {
    TIME_SLOTS.iter().position(|s| *s == label)
}

pub fn is_known_slot(label: &str) -> bool {
    slot_position(label).is_some()
}

/// Orders appointments by date, then by slot position within the day.
pub fn sort_by_schedule(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|a| {
        (
            a.appointment_date,
            slot_position(&a.time_slot).unwrap_or(usize::MAX),
        )
    });
}

/* -------------------------
   Doctors
--------------------------*/

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub specialty: String,
    pub image: String,
    /// Weekdays the doctor sees patients, 0 = Sunday.
    pub available_days: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub name: String,
    pub specialty: String,
    pub image: String,
    pub available_days: Vec<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct DoctorPatch {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub image: Option<String>,
    pub available_days: Option<Vec<i32>>,
}

/* -------------------------
   Appointments
--------------------------*/

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub phone: String,
    pub age: Option<String>,
    pub reason: Option<String>,
    pub appointment_date: NaiveDate,
    pub time_slot: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    pub patient_name: String,
    pub phone: String,
    pub age: Option<String>,
    pub reason: Option<String>,
    pub appointment_date: NaiveDate,
    pub time_slot: String,
}

/// Appointment as listed in the back office, with its doctor embedded.
#[derive(Debug, Serialize)]
pub struct AppointmentWithDoctor {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Option<Doctor>,
}

/* -------------------------
   Staff / admin identities
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Receptionist,
    Nurse,
    Technician,
    Staff,
}

impl StaffRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Receptionist => "receptionist",
            StaffRole::Nurse => "nurse",
            StaffRole::Technician => "technician",
            StaffRole::Staff => "staff",
        }
    }

    pub fn is_admin(self) -> bool {
        self == StaffRole::Admin
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(StaffRole::Admin),
            "receptionist" => Ok(StaffRole::Receptionist),
            "nurse" => Ok(StaffRole::Nurse),
            "technician" => Ok(StaffRole::Technician),
            "staff" => Ok(StaffRole::Staff),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Staff {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: StaffRole,
    pub token_hash: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: StaffRole,
}

/// Partial update; `name` also becomes the username when set.
#[derive(Debug, Clone, Default)]
pub struct StaffUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<StaffRole>,
    pub password_hash: Option<String>,
}

/// Identity as exposed over the API. Never carries the password or token.
#[derive(Debug, Serialize)]
pub struct StaffProfile {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&Staff> for StaffProfile {
    fn from(s: &Staff) -> Self {
        StaffProfile {
            id: s.id,
            username: s.username.clone(),
            name: s.name.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            role: s.role,
            last_login: s.last_login,
            created_at: s.created_at,
        }
    }
}

/* -------------------------
   Shared DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
