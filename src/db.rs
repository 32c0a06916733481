use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::{
    auth::repo::UserRepo, config::AppConfig, events::repo::EventRepo, guests::repo::GuestRepo,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write; carries what was duplicated.
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Maps a sqlx error, turning unique violations into `Conflict(what)`.
    pub fn from_sqlx(e: sqlx::Error, what: &'static str) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
            _ => StoreError::Backend(e.into()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.into())
    }
}

/// Everything the handlers need from persistence.
pub trait Store: UserRepo + EventRepo + GuestRepo + Send + Sync {}

impl<T> Store for T where T: UserRepo + EventRepo + GuestRepo + Send + Sync {}

#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig, url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// These run against a real Postgres when `DATABASE_URL` is set and are
/// skipped otherwise. Every test works on its own fresh user.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::NewUser,
        events::repo::{EventChanges, NewEvent},
        guests::repo::NewGuest,
    };
    use time::macros::datetime;
    use uuid::Uuid;

    async fn pg() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())?;
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("pg-test-secret".into()),
            _ => None,
        })
        .unwrap();
        let store = PgStore::connect(&config, &url).await.unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    async fn fresh_user(store: &PgStore) -> Uuid {
        let email = format!("{}@example.com", Uuid::new_v4());
        store
            .create_user(NewUser {
                name: "Test",
                email: &email,
                password_hash: "hash",
            })
            .await
            .unwrap()
            .id
    }

    async fn fresh_event(store: &PgStore, user_id: Uuid) -> Uuid {
        store
            .create_event(NewEvent {
                user_id,
                name: "Party",
                description: "Rooftop",
                date_time: datetime!(2030-06-01 18:00 UTC),
            })
            .await
            .unwrap()
            .id
    }

    async fn fresh_guest(store: &PgStore, event_id: Uuid) -> Uuid {
        store
            .create_guest(NewGuest {
                event_id,
                name: "Bob",
                email: "bob@x.com",
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn pg_duplicate_email_is_a_conflict() {
        let Some(store) = pg().await else { return };
        let email = format!("{}@example.com", Uuid::new_v4());
        let new = || NewUser {
            name: "Alice",
            email: &email,
            password_hash: "hash",
        };
        store.create_user(new()).await.unwrap();
        let err = store.create_user(new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));
    }

    #[tokio::test]
    async fn pg_partial_update_keeps_untouched_fields() {
        let Some(store) = pg().await else { return };
        let owner = fresh_user(&store).await;
        let stranger = fresh_user(&store).await;
        let event_id = fresh_event(&store, owner).await;

        let changes = || EventChanges {
            description: Some("Garden"),
            ..Default::default()
        };
        assert!(store
            .update_event(stranger, event_id, changes())
            .await
            .unwrap()
            .is_none());

        let updated = store
            .update_event(owner, event_id, changes())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Party");
        assert_eq!(updated.description, "Garden");
        assert_eq!(updated.date_time, datetime!(2030-06-01 18:00 UTC));
    }

    #[tokio::test]
    async fn pg_credential_is_write_once() {
        let Some(store) = pg().await else { return };
        let owner = fresh_user(&store).await;
        let event_id = fresh_event(&store, owner).await;
        let guest_id = fresh_guest(&store, event_id).await;

        store.set_guest_credential(guest_id, "AAA").await.unwrap();
        store.set_guest_credential(guest_id, "AAA").await.unwrap();
        let err = store.set_guest_credential(guest_id, "BBB").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = store
            .set_guest_credential(Uuid::new_v4(), "AAA")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = store.guest_for_owner(owner, guest_id).await.unwrap().unwrap();
        assert_eq!(stored.qr_code.as_deref(), Some("AAA"));
    }

    #[tokio::test]
    async fn pg_check_in_requires_matching_event_and_owner() {
        let Some(store) = pg().await else { return };
        let owner = fresh_user(&store).await;
        let stranger = fresh_user(&store).await;
        let event_id = fresh_event(&store, owner).await;
        let other_event = fresh_event(&store, owner).await;
        let guest_id = fresh_guest(&store, event_id).await;

        assert!(store.guest_for_owner(stranger, guest_id).await.unwrap().is_none());
        assert!(store
            .mark_attended(stranger, event_id, guest_id)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .mark_attended(owner, other_event, guest_id)
            .await
            .unwrap()
            .is_none());
        let checked = store
            .mark_attended(owner, event_id, guest_id)
            .await
            .unwrap()
            .unwrap();
        assert!(checked.attended);
    }

    #[tokio::test]
    async fn pg_delete_guest_removes_the_row() {
        let Some(store) = pg().await else { return };
        let owner = fresh_user(&store).await;
        let event_id = fresh_event(&store, owner).await;
        let guest_id = fresh_guest(&store, event_id).await;

        store.delete_guest(guest_id).await.unwrap();
        assert!(store.guests_for_event(event_id).await.unwrap().is_empty());
    }
}
