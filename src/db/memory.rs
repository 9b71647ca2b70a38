use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{
    sort_by_schedule, Appointment, Doctor, DoctorPatch, NewAppointment, NewDoctor, NewStaff,
    Staff, StaffUpdate,
};

#[derive(Default)]
struct Tables {
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
    staff: Vec<Staff>,
    /// session hash -> staff id
    sessions: HashMap<String, Uuid>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.staff
            .iter()
            .any(|s| Some(s.id) != except && s.email.as_deref() == Some(email))
    }

    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.staff
            .iter()
            .any(|s| Some(s.id) != except && s.username == username)
    }
}

/// Process-local store. All tables sit behind one lock, so every check
/// performed inside a mutation is atomic with that mutation.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let t = self.tables.lock().await;
        let mut doctors = t.doctors.clone();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.doctors.iter().find(|d| d.id == id).cloned())
    }

    async fn count_doctors(&self) -> Result<i64, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.doctors.len() as i64)
    }

    async fn create_doctor(&self, doctor: NewDoctor) -> Result<Doctor, StoreError> {
        let mut t = self.tables.lock().await;
        let row = Doctor {
            id: Uuid::new_v4(),
            name: doctor.name,
            specialty: doctor.specialty,
            image: doctor.image,
            available_days: doctor.available_days,
        };
        t.doctors.push(row.clone());
        Ok(row)
    }

    async fn update_doctor(
        &self,
        id: Uuid,
        patch: DoctorPatch,
    ) -> Result<Option<Doctor>, StoreError> {
        let mut t = self.tables.lock().await;
        let Some(d) = t.doctors.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            d.name = name;
        }
        if let Some(specialty) = patch.specialty {
            d.specialty = specialty;
        }
        if let Some(image) = patch.image {
            d.image = image;
        }
        if let Some(days) = patch.available_days {
            d.available_days = days;
        }
        Ok(Some(d.clone()))
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.doctors.len();
        t.doctors.retain(|d| d.id != id);
        if t.doctors.len() == before {
            return Ok(false);
        }
        t.appointments.retain(|a| a.doctor_id != id);
        Ok(true)
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows = t.appointments.clone();
        sort_by_schedule(&mut rows);
        Ok(rows)
    }

    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Appointment> = t
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        sort_by_schedule(&mut rows);
        Ok(rows)
    }

    async fn slot_booked(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<bool, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.appointments.iter().any(|a| {
            a.doctor_id == doctor_id && a.appointment_date == date && a.time_slot == time_slot
        }))
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        let mut t = self.tables.lock().await;

        if !t.doctors.iter().any(|d| d.id == appointment.doctor_id) {
            return Err(StoreError::UnknownDoctor);
        }
        let taken = t.appointments.iter().any(|a| {
            a.doctor_id == appointment.doctor_id
                && a.appointment_date == appointment.appointment_date
                && a.time_slot == appointment.time_slot
        });
        if taken {
            return Err(StoreError::SlotTaken);
        }

        let row = Appointment {
            id: Uuid::new_v4(),
            doctor_id: appointment.doctor_id,
            patient_name: appointment.patient_name,
            phone: appointment.phone,
            age: appointment.age,
            reason: appointment.reason,
            appointment_date: appointment.appointment_date,
            time_slot: appointment.time_slot,
            created_at: Utc::now(),
        };
        t.appointments.push(row.clone());
        Ok(row)
    }

    async fn find_staff_by_login(&self, login: &str) -> Result<Option<Staff>, StoreError> {
        let t = self.tables.lock().await;
        let by_username = t.staff.iter().find(|s| s.username == login);
        let found = by_username.or_else(|| {
            t.staff
                .iter()
                .filter(|s| s.name.as_deref() == Some(login))
                .min_by_key(|s| s.created_at)
        });
        Ok(found.cloned())
    }

    async fn list_staff_members(&self) -> Result<Vec<Staff>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows: Vec<Staff> = t
            .staff
            .iter()
            .filter(|s| !s.role.is_admin())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn create_staff(&self, staff: NewStaff) -> Result<Staff, StoreError> {
        let mut t = self.tables.lock().await;
        if t.username_taken(&staff.username, None) {
            return Err(StoreError::Duplicate("username"));
        }
        if let Some(email) = staff.email.as_deref() {
            if t.email_taken(email, None) {
                return Err(StoreError::Duplicate("email"));
            }
        }

        let row = Staff {
            id: Uuid::new_v4(),
            username: staff.username,
            name: staff.name,
            email: staff.email,
            phone: staff.phone,
            password_hash: staff.password_hash,
            role: staff.role,
            token_hash: None,
            last_login: None,
            created_at: Utc::now(),
        };
        t.staff.push(row.clone());
        Ok(row)
    }

    async fn update_staff(
        &self,
        id: Uuid,
        update: StaffUpdate,
    ) -> Result<Option<Staff>, StoreError> {
        let mut t = self.tables.lock().await;
        if !t.staff.iter().any(|s| s.id == id) {
            return Ok(None);
        }
        if let Some(name) = update.name.as_deref() {
            if t.username_taken(name, Some(id)) {
                return Err(StoreError::Duplicate("username"));
            }
        }
        if let Some(email) = update.email.as_deref() {
            if t.email_taken(email, Some(id)) {
                return Err(StoreError::Duplicate("email"));
            }
        }

        let Some(s) = t.staff.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            s.username = name.clone();
            s.name = Some(name);
        }
        if let Some(email) = update.email {
            s.email = Some(email);
        }
        if let Some(phone) = update.phone {
            s.phone = Some(phone);
        }
        if let Some(role) = update.role {
            s.role = role;
        }
        if let Some(hash) = update.password_hash {
            s.password_hash = hash;
        }
        Ok(Some(s.clone()))
    }

    async fn delete_staff(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let before = t.staff.len();
        t.staff.retain(|s| s.id != id);
        if t.staff.len() == before {
            return Ok(false);
        }
        t.sessions.retain(|_, staff_id| *staff_id != id);
        Ok(true)
    }

    async fn touch_last_login(&self, staff_id: Uuid) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if let Some(s) = t.staff.iter_mut().find(|s| s.id == staff_id) {
            s.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_token_hash(
        &self,
        staff_id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        if let Some(s) = t.staff.iter_mut().find(|s| s.id == staff_id) {
            s.token_hash = token_hash.map(str::to_owned);
        }
        Ok(())
    }

    async fn staff_by_token_hash(&self, token_hash: &str) -> Result<Option<Staff>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.staff
            .iter()
            .find(|s| s.token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn clear_token_hash(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        let mut cleared = false;
        for s in t
            .staff
            .iter_mut()
            .filter(|s| s.token_hash.as_deref() == Some(token_hash))
        {
            s.token_hash = None;
            cleared = true;
        }
        Ok(cleared)
    }

    async fn replace_session(
        &self,
        staff_id: Uuid,
        session_hash: &str,
    ) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        t.sessions.retain(|_, id| *id != staff_id);
        t.sessions.insert(session_hash.to_owned(), staff_id);
        Ok(())
    }

    async fn staff_by_session_hash(
        &self,
        session_hash: &str,
    ) -> Result<Option<Staff>, StoreError> {
        let t = self.tables.lock().await;
        let Some(staff_id) = t.sessions.get(session_hash) else {
            return Ok(None);
        };
        Ok(t.staff.iter().find(|s| s.id == *staff_id).cloned())
    }

    async fn delete_session(&self, session_hash: &str) -> Result<bool, StoreError> {
        let mut t = self.tables.lock().await;
        Ok(t.sessions.remove(session_hash).is_some())
    }
}
