use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{
    sort_by_schedule, Appointment, Doctor, DoctorPatch, NewAppointment, NewDoctor, NewStaff,
    Staff, StaffRole, StaffUpdate,
};

/// Opens the pool and applies `migrations/`.
pub async fn connect_pg(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

// Constraint names declared in migrations/0001_init.sql.
const SLOT_KEY: &str = "appointments_doctor_slot_key";
const DOCTOR_FKEY: &str = "appointments_doctor_id_fkey";
const USERNAME_KEY: &str = "staff_username_key";
const EMAIL_KEY: &str = "staff_email_key";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.constraint() {
                Some(SLOT_KEY) => return StoreError::SlotTaken,
                Some(DOCTOR_FKEY) => return StoreError::UnknownDoctor,
                Some(USERNAME_KEY) => return StoreError::Duplicate("username"),
                Some(EMAIL_KEY) => return StoreError::Duplicate("email"),
                _ => {}
            }
        }
        StoreError::Database(e)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StaffDbRow {
    id: Uuid,
    username: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    password_hash: String,
    role: String,
    token_hash: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<StaffDbRow> for Staff {
    fn from(r: StaffDbRow) -> Self {
        Staff {
            id: r.id,
            username: r.username,
            name: r.name,
            email: r.email,
            phone: r.phone,
            password_hash: r.password_hash,
            // the CHECK constraint on staff.role keeps this in the known set
            role: r.role.parse().unwrap_or(StaffRole::Staff),
            token_hash: r.token_hash,
            last_login: r.last_login,
            created_at: r.created_at,
        }
    }
}

const STAFF_COLUMNS: &str = "id, username, name, email, phone, password_hash, role, token_hash, last_login, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_staff(&self, filter: &str, value: &str) -> Result<Option<Staff>, StoreError> {
        let sql = format!("SELECT {STAFF_COLUMNS} FROM staff WHERE {filter} = $1");
        let row = sqlx::query_as::<_, StaffDbRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Staff::from))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        let rows = sqlx::query_as::<_, Doctor>(
            r#"
            SELECT id, name, specialty, image, available_days
            FROM doctors
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        let row = sqlx::query_as::<_, Doctor>(
            r#"
            SELECT id, name, specialty, image, available_days
            FROM doctors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count_doctors(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctors")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn create_doctor(&self, doctor: NewDoctor) -> Result<Doctor, StoreError> {
        let row = sqlx::query_as::<_, Doctor>(
            r#"
            INSERT INTO doctors (name, specialty, image, available_days)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, specialty, image, available_days
            "#,
        )
        .bind(&doctor.name)
        .bind(&doctor.specialty)
        .bind(&doctor.image)
        .bind(&doctor.available_days)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_doctor(
        &self,
        id: Uuid,
        patch: DoctorPatch,
    ) -> Result<Option<Doctor>, StoreError> {
        let row = sqlx::query_as::<_, Doctor>(
            r#"
            UPDATE doctors
            SET name           = COALESCE($2, name),
                specialty      = COALESCE($3, specialty),
                image          = COALESCE($4, image),
                available_days = COALESCE($5, available_days)
            WHERE id = $1
            RETURNING id, name, specialty, image, available_days
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.specialty)
        .bind(patch.image)
        .bind(patch.available_days)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_doctor(&self, id: Uuid) -> Result<bool, StoreError> {
        // appointments go with it through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM doctors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        let mut rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_name, phone, age, reason,
                   appointment_date, time_slot, created_at
            FROM appointments
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        sort_by_schedule(&mut rows);
        Ok(rows)
    }

    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut rows = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT id, doctor_id, patient_name, phone, age, reason,
                   appointment_date, time_slot, created_at
            FROM appointments
            WHERE doctor_id = $1
            "#,
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await?;
        sort_by_schedule(&mut rows);
        Ok(rows)
    }

    async fn slot_booked(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM appointments
                WHERE doctor_id = $1
                  AND appointment_date = $2
                  AND time_slot = $3
            )
            "#,
        )
        .bind(doctor_id)
        .bind(date)
        .bind(time_slot)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, StoreError> {
        // appointments_doctor_slot_key and appointments_doctor_id_fkey are
        // reported through From<sqlx::Error> as SlotTaken / UnknownDoctor
        let row = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments
                (doctor_id, patient_name, phone, age, reason, appointment_date, time_slot)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, doctor_id, patient_name, phone, age, reason,
                      appointment_date, time_slot, created_at
            "#,
        )
        .bind(appointment.doctor_id)
        .bind(&appointment.patient_name)
        .bind(&appointment.phone)
        .bind(&appointment.age)
        .bind(&appointment.reason)
        .bind(appointment.appointment_date)
        .bind(&appointment.time_slot)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_staff_by_login(&self, login: &str) -> Result<Option<Staff>, StoreError> {
        if let Some(staff) = self.fetch_staff("username", login).await? {
            return Ok(Some(staff));
        }
        let sql = format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE name = $1 ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, StaffDbRow>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Staff::from))
    }

    async fn list_staff_members(&self) -> Result<Vec<Staff>, StoreError> {
        let sql = format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE role <> 'admin' ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, StaffDbRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Staff::from).collect())
    }

    async fn create_staff(&self, staff: NewStaff) -> Result<Staff, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO staff (username, name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {STAFF_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, StaffDbRow>(&sql)
            .bind(&staff.username)
            .bind(&staff.name)
            .bind(&staff.email)
            .bind(&staff.phone)
            .bind(&staff.password_hash)
            .bind(staff.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update_staff(
        &self,
        id: Uuid,
        update: StaffUpdate,
    ) -> Result<Option<Staff>, StoreError> {
        let sql = format!(
            r#"
            UPDATE staff
            SET username      = COALESCE($2, username),
                name          = COALESCE($2, name),
                email         = COALESCE($3, email),
                phone         = COALESCE($4, phone),
                role          = COALESCE($5, role),
                password_hash = COALESCE($6, password_hash)
            WHERE id = $1
            RETURNING {STAFF_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, StaffDbRow>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.email)
            .bind(update.phone)
            .bind(update.role.map(StaffRole::as_str))
            .bind(update.password_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Staff::from))
    }

    async fn delete_staff(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM staff WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn touch_last_login(&self, staff_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE staff SET last_login = now() WHERE id = $1")
            .bind(staff_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_token_hash(
        &self,
        staff_id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE staff SET token_hash = $2 WHERE id = $1")
            .bind(staff_id)
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn staff_by_token_hash(&self, token_hash: &str) -> Result<Option<Staff>, StoreError> {
        self.fetch_staff("token_hash", token_hash).await
    }

    async fn clear_token_hash(&self, token_hash: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE staff SET token_hash = NULL WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn replace_session(
        &self,
        staff_id: Uuid,
        session_hash: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM staff_sessions WHERE staff_id = $1")
            .bind(staff_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO staff_sessions (session_hash, staff_id) VALUES ($1, $2)")
            .bind(session_hash)
            .bind(staff_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn staff_by_session_hash(
        &self,
        session_hash: &str,
    ) -> Result<Option<Staff>, StoreError> {
        let row = sqlx::query_as::<_, StaffDbRow>(
            r#"
            SELECT s.id, s.username, s.name, s.email, s.phone, s.password_hash,
                   s.role, s.token_hash, s.last_login, s.created_at
            FROM staff s
            JOIN staff_sessions ss ON ss.staff_id = s.id
            WHERE ss.session_hash = $1
            "#,
        )
        .bind(session_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Staff::from))
    }

    async fn delete_session(&self, session_hash: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM staff_sessions WHERE session_hash = $1")
            .bind(session_hash)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
