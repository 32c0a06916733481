use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{PgStore, StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guest {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub attended: bool,
    pub qr_code: Option<String>, // NULL until the credential update lands
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewGuest<'a> {
    pub event_id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
}

#[async_trait]
pub trait GuestRepo: Send + Sync {
    async fn create_guest(&self, new: NewGuest<'_>) -> StoreResult<Guest>;
    async fn delete_guest(&self, guest_id: Uuid) -> StoreResult<()>;
    async fn guests_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Guest>>;
    /// The guest, if it belongs to one of `user_id`'s events.
    async fn guest_for_owner(&self, user_id: Uuid, guest_id: Uuid) -> StoreResult<Option<Guest>>;
    /// Stores the credential once. Writing the same value again is a no-op;
    /// a different value, or a missing guest, is `Conflict`.
    async fn set_guest_credential(&self, guest_id: Uuid, qr_code: &str) -> StoreResult<()>;
    /// Marks the guest attended if it is in `event_id` and that event is `user_id`'s.
    async fn mark_attended(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        guest_id: Uuid,
    ) -> StoreResult<Option<Guest>>;
}

#[async_trait]
impl GuestRepo for PgStore {
    async fn create_guest(&self, new: NewGuest<'_>) -> StoreResult<Guest> {
        let guest = sqlx::query_as::<_, Guest>(
            r#"
            INSERT INTO guests (event_id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, event_id, name, email, attended, qr_code, created_at
            "#,
        )
        .bind(new.event_id)
        .bind(new.name)
        .bind(new.email)
        .fetch_one(&self.pool)
        .await
        .context("insert guest")?;
        Ok(guest)
    }

    async fn delete_guest(&self, guest_id: Uuid) -> StoreResult<()> {
        sqlx::query(r#"DELETE FROM guests WHERE id = $1"#)
            .bind(guest_id)
            .execute(&self.pool)
            .await
            .context("delete guest")?;
        Ok(())
    }

    async fn guests_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Guest>> {
        let rows = sqlx::query_as::<_, Guest>(
            r#"
            SELECT id, event_id, name, email, attended, qr_code, created_at
              FROM guests
             WHERE event_id = $1
             ORDER BY created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .context("list guests by event")?;
        Ok(rows)
    }

    async fn guest_for_owner(&self, user_id: Uuid, guest_id: Uuid) -> StoreResult<Option<Guest>> {
        let guest = sqlx::query_as::<_, Guest>(
            r#"
            SELECT g.id, g.event_id, g.name, g.email, g.attended, g.qr_code, g.created_at
              FROM guests g
              JOIN events e ON e.id = g.event_id
             WHERE g.id = $1 AND e.user_id = $2
            "#,
        )
        .bind(guest_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("get guest for owner")?;
        Ok(guest)
    }

    async fn set_guest_credential(&self, guest_id: Uuid, qr_code: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE guests
               SET qr_code = $2
             WHERE id = $1 AND (qr_code IS NULL OR qr_code = $2)
            "#,
        )
        .bind(guest_id)
        .bind(qr_code)
        .execute(&self.pool)
        .await
        .context("set guest credential")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict("guest credential"));
        }
        Ok(())
    }

    async fn mark_attended(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        guest_id: Uuid,
    ) -> StoreResult<Option<Guest>> {
        let guest = sqlx::query_as::<_, Guest>(
            r#"
            UPDATE guests g
               SET attended = TRUE
              FROM events e
             WHERE g.id = $1
               AND g.event_id = $2
               AND e.id = g.event_id
               AND e.user_id = $3
            RETURNING g.id, g.event_id, g.name, g.email, g.attended, g.qr_code, g.created_at
            "#,
        )
        .bind(guest_id)
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("mark guest attended")?;
        Ok(guest)
    }
}
