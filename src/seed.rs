use anyhow::anyhow;

use crate::auth::hash_password;
use crate::db::Store;
use crate::models::{NewDoctor, NewStaff, StaffRole};

const DEMO_DOCTORS: [(&str, &str, &str, &[i32]); 4] = [
    (
        "Dr. Sarah Chen",
        "Cardiologist",
        "https://images.unsplash.com/photo-1559839734-2b71ea197ec2?auto=format&fit=crop&q=80&w=300&h=300",
        &[1, 2, 3, 4, 5],
    ),
    (
        "Dr. Michael Ross",
        "Dermatologist",
        "https://images.unsplash.com/photo-1612349317150-e413f6a5b16d?auto=format&fit=crop&q=80&w=300&h=300",
        &[1, 3, 5],
    ),
    (
        "Dr. Emily Watson",
        "Pediatrician",
        "https://images.unsplash.com/photo-1594824476967-48c8b964273f?auto=format&fit=crop&q=80&w=300&h=300",
        &[2, 4, 6],
    ),
    (
        "Dr. James Carter",
        "General Practitioner",
        "https://images.unsplash.com/photo-1537368910025-700350fe46c7?auto=format&fit=crop&q=80&w=300&h=300",
        &[1, 2, 3, 4, 5],
    ),
];

/// Inserts the demo roster unless doctors already exist.
pub async fn seed_doctors(store: &dyn Store) -> anyhow::Result<usize> {
    if store.count_doctors().await? > 0 {
        tracing::info!("doctors already present, skipping seed");
        return Ok(0);
    }

    for (name, specialty, image, days) in DEMO_DOCTORS {
        store
            .create_doctor(NewDoctor {
                name: name.to_string(),
                specialty: specialty.to_string(),
                image: image.to_string(),
                available_days: days.to_vec(),
            })
            .await?;
    }
    tracing::info!(count = DEMO_DOCTORS.len(), "seeded demo doctors");
    Ok(DEMO_DOCTORS.len())
}

/// Creates the admin identity if the username is still free.
pub async fn bootstrap_admin(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> anyhow::Result<bool> {
    if store.find_staff_by_login(username).await?.is_some() {
        return Ok(false);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow!(e))?;
    store
        .create_staff(NewStaff {
            username: username.to_string(),
            name: Some(username.to_string()),
            email: None,
            phone: None,
            password_hash,
            role: StaffRole::Admin,
        })
        .await?;

    tracing::info!(%username, "bootstrap admin created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(seed_doctors(&store).await.unwrap(), 4);
        assert_eq!(seed_doctors(&store).await.unwrap(), 0);
        assert_eq!(store.count_doctors().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn bootstrap_admin_only_once() {
        let store = MemoryStore::new();
        assert!(bootstrap_admin(&store, "admin", "admin123").await.unwrap());
        assert!(!bootstrap_admin(&store, "admin", "other").await.unwrap());
        let admin = store.find_staff_by_login("admin").await.unwrap().unwrap();
        assert!(admin.role.is_admin());
    }
}
