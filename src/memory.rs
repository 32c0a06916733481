//! Process-local store for development without Postgres and for tests.
//! Applies the same uniqueness and ownership rules as the SQL schema.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo::{NewUser, User, UserRepo},
    db::{StoreError, StoreResult},
    events::repo::{Event, EventChanges, EventRepo, NewEvent},
    guests::repo::{Guest, GuestRepo, NewGuest},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    guests: HashMap<Uuid, Guest>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    fail_credential_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("memory store lock poisoned")))
    }

    #[cfg(test)]
    pub(crate) fn fail_credential_writes(&self, fail: bool) {
        self.fail_credential_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

fn owns(tables: &Tables, user_id: Uuid, event_id: Uuid) -> bool {
    tables
        .events
        .get(&event_id)
        .is_some_and(|e| e.user_id == user_id)
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, new: NewUser<'_>) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.to_owned(),
            email: new.email.to_owned(),
            password_hash: new.password_hash.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }
}

#[async_trait]
impl EventRepo for MemoryStore {
    async fn create_event(&self, new: NewEvent<'_>) -> StoreResult<Event> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::Backend(anyhow::anyhow!("event owner does not exist")));
        }
        let event = Event {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name.to_owned(),
            description: new.description.to_owned(),
            date_time: new.date_time,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn events_for_owner(&self, user_id: Uuid) -> StoreResult<Vec<Event>> {
        let tables = self.read()?;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date_time, e.created_at));
        Ok(events)
    }

    async fn event_for_owner(&self, user_id: Uuid, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self
            .read()?
            .events
            .get(&event_id)
            .filter(|e| e.user_id == user_id)
            .cloned())
    }

    async fn update_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        changes: EventChanges<'_>,
    ) -> StoreResult<Option<Event>> {
        let mut tables = self.write()?;
        let Some(event) = tables
            .events
            .get_mut(&event_id)
            .filter(|e| e.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            event.name = name.to_owned();
        }
        if let Some(description) = changes.description {
            event.description = description.to_owned();
        }
        if let Some(date_time) = changes.date_time {
            event.date_time = date_time;
        }
        Ok(Some(event.clone()))
    }
}

#[async_trait]
impl GuestRepo for MemoryStore {
    async fn create_guest(&self, new: NewGuest<'_>) -> StoreResult<Guest> {
        let mut tables = self.write()?;
        if !tables.events.contains_key(&new.event_id) {
            return Err(StoreError::Backend(anyhow::anyhow!("guest event does not exist")));
        }
        let guest = Guest {
            id: Uuid::new_v4(),
            event_id: new.event_id,
            name: new.name.to_owned(),
            email: new.email.to_owned(),
            attended: false,
            qr_code: None,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.guests.insert(guest.id, guest.clone());
        Ok(guest)
    }

    async fn delete_guest(&self, guest_id: Uuid) -> StoreResult<()> {
        self.write()?.guests.remove(&guest_id);
        Ok(())
    }

    async fn guests_for_event(&self, event_id: Uuid) -> StoreResult<Vec<Guest>> {
        let tables = self.read()?;
        let mut guests: Vec<Guest> = tables
            .guests
            .values()
            .filter(|g| g.event_id == event_id)
            .cloned()
            .collect();
        guests.sort_by_key(|g| g.created_at);
        Ok(guests)
    }

    async fn guest_for_owner(&self, user_id: Uuid, guest_id: Uuid) -> StoreResult<Option<Guest>> {
        let tables = self.read()?;
        Ok(tables
            .guests
            .get(&guest_id)
            .filter(|g| owns(&tables, user_id, g.event_id))
            .cloned())
    }

    async fn set_guest_credential(&self, guest_id: Uuid, qr_code: &str) -> StoreResult<()> {
        #[cfg(test)]
        if self
            .fail_credential_writes
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StoreError::Backend(anyhow::anyhow!("injected write failure")));
        }

        let mut tables = self.write()?;
        match tables.guests.get_mut(&guest_id) {
            Some(guest) if guest.qr_code.as_deref().map_or(true, |c| c == qr_code) => {
                guest.qr_code = Some(qr_code.to_owned());
                Ok(())
            }
            _ => Err(StoreError::Conflict("guest credential")),
        }
    }

    async fn mark_attended(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        guest_id: Uuid,
    ) -> StoreResult<Option<Guest>> {
        let mut tables = self.write()?;
        if !owns(&tables, user_id, event_id) {
            return Ok(None);
        }
        let Some(guest) = tables
            .guests
            .get_mut(&guest_id)
            .filter(|g| g.event_id == event_id)
        else {
            return Ok(None);
        };
        guest.attended = true;
        Ok(Some(guest.clone()))
    }
}
