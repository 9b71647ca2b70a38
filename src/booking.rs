//! Slot availability and appointment booking.
//!
//! The uniqueness of (doctor, date, slot) is owned by the store: the
//! availability check here is a pre-check, and the store's insert is what
//! decides a race between two requests for the same slot.

use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Store, StoreError};
use crate::error::ApiError;
use crate::models::{is_known_slot, Appointment, NewAppointment};

/// Body of `POST /appointments` and `POST /admin/appointments`.
#[derive(Debug, Default, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Option<String>,
    pub patient_name: Option<String>,
    pub phone: Option<String>,
    pub age: Option<String>,
    pub reason: Option<String>,
    pub appointment_date: Option<String>,
    pub time_slot: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("The {field} field is required."))),
    }
}

pub fn parse_doctor_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest("The selected doctor id is invalid.".into()))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest("The appointment date field must be a valid date.".into())
    })
}

pub fn check_slot(raw: &str) -> Result<(), ApiError> {
    if is_known_slot(raw) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("The selected time slot is invalid.".into()))
    }
}

impl BookingRequest {
    /// Field validation. Submitted values are kept as sent.
    pub fn validate(self) -> Result<NewAppointment, ApiError> {
        let doctor_id = parse_doctor_id(required(&self.doctor_id, "doctor id")?)?;
        required(&self.patient_name, "patient name")?;
        required(&self.phone, "phone")?;
        let appointment_date = parse_date(required(&self.appointment_date, "appointment date")?)?;
        check_slot(required(&self.time_slot, "time slot")?)?;

        Ok(NewAppointment {
            doctor_id,
            patient_name: self.patient_name.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            age: self.age,
            reason: self.reason,
            appointment_date,
            time_slot: self.time_slot.unwrap_or_default(),
        })
    }
}

/// True iff no appointment holds the triple. Unknown doctors read as available.
pub async fn is_available(
    store: &dyn Store,
    doctor_id: Uuid,
    date: NaiveDate,
    time_slot: &str,
) -> Result<bool, StoreError> {
    Ok(!store.slot_booked(doctor_id, date, time_slot).await?)
}

/// Validate, re-check availability, insert. No row is written on any error.
pub async fn book_appointment(
    store: &dyn Store,
    req: BookingRequest,
) -> Result<Appointment, ApiError> {
    let new = req.validate()?;

    if !is_available(store, new.doctor_id, new.appointment_date, &new.time_slot).await? {
        tracing::warn!(
            doctor_id = %new.doctor_id,
            date = %new.appointment_date,
            slot = %new.time_slot,
            "booking rejected: slot already taken"
        );
        return Err(ApiError::slot_unavailable());
    }

    let appointment = store.insert_appointment(new).await.map_err(|e| {
        if matches!(e, StoreError::SlotTaken) {
            tracing::warn!("booking lost race for slot at insert");
        }
        ApiError::from(e)
    })?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        date = %appointment.appointment_date,
        slot = %appointment.time_slot,
        "appointment booked"
    );
    Ok(appointment)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewDoctor;

    fn request(doctor_id: Uuid) -> BookingRequest {
        BookingRequest {
            doctor_id: Some(doctor_id.to_string()),
            patient_name: Some("Jane Doe".into()),
            phone: Some("555-0100".into()),
            age: Some("34".into()),
            reason: Some("Checkup".into()),
            appointment_date: Some("2025-06-10".into()),
            time_slot: Some("09:00 AM".into()),
        }
    }

    async fn store_with_doctor() -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let d = store
            .create_doctor(NewDoctor {
                name: "Dr. Sarah Chen".into(),
                specialty: "Cardiologist".into(),
                image: "/img/sarah.jpg".into(),
                available_days: vec![1, 2, 3, 4, 5],
            })
            .await
            .unwrap();
        (store, d.id)
    }

    #[test]
    fn validation_requires_core_fields() {
        let id = Uuid::new_v4();

        let mut r = request(id);
        r.patient_name = Some("   ".into());
        assert!(matches!(r.validate(), Err(ApiError::BadRequest(_))));

        let mut r = request(id);
        r.phone = None;
        assert!(matches!(r.validate(), Err(ApiError::BadRequest(_))));

        let mut r = request(id);
        r.doctor_id = Some("dr-sarah".into());
        assert!(matches!(r.validate(), Err(ApiError::BadRequest(_))));

        let mut r = request(id);
        r.appointment_date = Some("2025-02-30".into());
        assert!(matches!(r.validate(), Err(ApiError::BadRequest(_))));

        let mut r = request(id);
        r.time_slot = Some("12:00 PM".into());
        assert!(matches!(r.validate(), Err(ApiError::BadRequest(_))));

        let mut r = request(id);
        r.age = None;
        r.reason = None;
        assert!(r.validate().is_ok());
    }

    #[tokio::test]
    async fn booked_slot_becomes_unavailable_and_rejects_second_booking() {
        let (store, doctor_id) = store_with_doctor().await;
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

        assert!(is_available(store.as_ref(), doctor_id, date, "09:00 AM").await.unwrap());
        book_appointment(store.as_ref(), request(doctor_id)).await.unwrap();
        assert!(!is_available(store.as_ref(), doctor_id, date, "09:00 AM").await.unwrap());
        assert!(is_available(store.as_ref(), doctor_id, date, "09:30 AM").await.unwrap());

        let second = book_appointment(store.as_ref(), request(doctor_id)).await;
        assert!(matches!(second, Err(ApiError::Conflict(ref m)) if m == crate::error::SLOT_UNAVAILABLE));
        assert_eq!(store.list_appointments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_doctor_is_a_validation_error() {
        let (store, _) = store_with_doctor().await;
        let res = book_appointment(store.as_ref(), request(Uuid::new_v4())).await;
        assert!(matches!(res, Err(ApiError::BadRequest(_))));
        assert!(store.list_appointments().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_for_one_slot_admit_exactly_one() {
        let (store, doctor_id) = store_with_doctor().await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                book_appointment(store.as_ref(), request(doctor_id)).await
            }));
        }

        let mut ok = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(ApiError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.list_appointments().await.unwrap().len(), 1);
    }
}
