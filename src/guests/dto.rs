use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Guest;

#[derive(Debug, Deserialize)]
pub struct CreateGuestRequest {
    pub name: String,
    pub email: String,
    pub event_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct GuestResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub attended: bool,
    pub qr_code: Option<String>, // base64 PNG
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Guest> for GuestResponse {
    fn from(g: Guest) -> Self {
        Self {
            id: g.id,
            event_id: g.event_id,
            name: g.name,
            email: g.email,
            attended: g.attended,
            qr_code: g.qr_code,
            created_at: g.created_at,
        }
    }
}
