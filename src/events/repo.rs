use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{PgStore, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub date_time: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewEvent<'a> {
    pub user_id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub date_time: OffsetDateTime,
}

/// Fields left `None` keep their stored value.
#[derive(Debug, Default)]
pub struct EventChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub date_time: Option<OffsetDateTime>,
}

/// Every lookup is scoped to an owner; someone else's event reads as absent.
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn create_event(&self, new: NewEvent<'_>) -> StoreResult<Event>;
    async fn events_for_owner(&self, user_id: Uuid) -> StoreResult<Vec<Event>>;
    async fn event_for_owner(&self, user_id: Uuid, event_id: Uuid) -> StoreResult<Option<Event>>;
    async fn update_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        changes: EventChanges<'_>,
    ) -> StoreResult<Option<Event>>;
}

#[async_trait]
impl EventRepo for PgStore {
    async fn create_event(&self, new: NewEvent<'_>) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (user_id, name, description, date_time)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, name, description, date_time, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.date_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn events_for_owner(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, user_id, name, description, date_time, created_at
            FROM events
            WHERE user_id = $1
            ORDER BY date_time ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn event_for_owner(&self, user_id: Uuid, event_id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, user_id, name, description, date_time, created_at
            FROM events
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn update_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        changes: EventChanges<'_>,
    ) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
               SET name = COALESCE($3, name),
                   description = COALESCE($4, description),
                   date_time = COALESCE($5, date_time)
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, description, date_time, created_at
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.date_time)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }
}
