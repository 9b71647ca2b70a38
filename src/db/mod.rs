use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Appointment, Doctor, DoctorPatch, NewAppointment, NewDoctor, NewStaff, Staff, StaffUpdate,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{connect_pg, PgStore};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The (doctor, date, slot) triple is already booked.
    #[error("time slot already booked")]
    SlotTaken,

    #[error("appointment references an unknown doctor")]
    UnknownDoctor,

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

/// Backing store for doctors, appointments and staff identities.
///
/// Implementations must enforce the booking invariants themselves:
/// `insert_appointment` fails with [`StoreError::SlotTaken`] when the triple is
/// already taken and with [`StoreError::UnknownDoctor`] when the doctor does
/// not exist, atomically with the insert.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;

    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError>;

    async fn count_doctors(&self) -> Result<i64, StoreError>;

    async fn create_doctor(&self, doctor: NewDoctor) -> Result<Doctor, StoreError>;

    async fn update_doctor(
        &self,
        id: Uuid,
        patch: DoctorPatch,
    ) -> Result<Option<Doctor>, StoreError>;

    /// Removes the doctor and every appointment referencing it.
    async fn delete_doctor(&self, id: Uuid) -> Result<bool, StoreError>;

    /// All appointments ordered by date, then slot.
    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError>;

    async fn appointments_for_doctor(&self, doctor_id: Uuid)
    -> Result<Vec<Appointment>, StoreError>;

    async fn slot_booked(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<bool, StoreError>;

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError>;

    /// Looks an identity up by username first, then by display name.
    async fn find_staff_by_login(&self, login: &str) -> Result<Option<Staff>, StoreError>;

    /// Every identity whose role is not admin.
    async fn list_staff_members(&self) -> Result<Vec<Staff>, StoreError>;

    async fn create_staff(&self, staff: NewStaff) -> Result<Staff, StoreError>;

    async fn update_staff(
        &self,
        id: Uuid,
        update: StaffUpdate,
    ) -> Result<Option<Staff>, StoreError>;

    async fn delete_staff(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn touch_last_login(&self, staff_id: Uuid) -> Result<(), StoreError>;

    /// Overwrites the identity's bearer token hash (`None` clears it).
    async fn set_token_hash(
        &self,
        staff_id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn staff_by_token_hash(&self, token_hash: &str) -> Result<Option<Staff>, StoreError>;

    /// Clears whichever identity holds this token hash.
    async fn clear_token_hash(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Drops all sessions of the identity and records a new one.
    async fn replace_session(&self, staff_id: Uuid, session_hash: &str)
    -> Result<(), StoreError>;

    async fn staff_by_session_hash(
        &self,
        session_hash: &str,
    ) -> Result<Option<Staff>, StoreError>;

    async fn delete_session(&self, session_hash: &str) -> Result<bool, StoreError>;
}
