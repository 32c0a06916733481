use anyhow::Context;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo::{Guest, GuestRepo, NewGuest};
use crate::{
    db::Store,
    error::{AppError, AppResult},
    events::repo::EventRepo,
    qr::{self, CredentialError},
};

pub struct GuestInput<'a> {
    pub event_id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
}

/// Persist, encode, then persist the credential.
///
/// The storage-assigned id is part of the QR payload, so the row has to exist
/// before the code can be rendered. If rendering fails the fresh row is
/// removed again; if only the final write fails the guest is kept and the
/// caller gets `CredentialPending`, which `ensure_credential` can repair.
pub async fn create_guest(
    store: &dyn Store,
    user_id: Uuid,
    input: GuestInput<'_>,
) -> AppResult<Guest> {
    create_guest_with(store, user_id, input, qr::encode_guest_pass).await
}

pub(crate) async fn create_guest_with<F>(
    store: &dyn Store,
    user_id: Uuid,
    input: GuestInput<'_>,
    encode: F,
) -> AppResult<Guest>
where
    F: Fn(Uuid, Uuid) -> Result<String, CredentialError>,
{
    store
        .event_for_owner(user_id, input.event_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut guest = store
        .create_guest(NewGuest {
            event_id: input.event_id,
            name: input.name,
            email: input.email,
        })
        .await?;

    let qr_code = match encode(guest.id, guest.event_id) {
        Ok(code) => code,
        Err(e) => {
            if let Err(cleanup) = store.delete_guest(guest.id).await {
                error!(guest_id = %guest.id, error = %cleanup, "could not remove guest after qr failure");
            }
            return Err(AppError::Internal(
                anyhow::Error::from(e).context("generate guest qr code"),
            ));
        }
    };

    if let Err(e) = store.set_guest_credential(guest.id, &qr_code).await {
        warn!(guest_id = %guest.id, "guest stored without credential");
        return Err(AppError::CredentialPending(
            anyhow::Error::from(e).context("store guest qr code"),
        ));
    }
    guest.qr_code = Some(qr_code);

    info!(guest_id = %guest.id, event_id = %guest.event_id, "guest created");
    Ok(guest)
}

/// Fills in a missing credential. A guest that already has one is returned as is.
pub async fn ensure_credential(store: &dyn Store, user_id: Uuid, guest_id: Uuid) -> AppResult<Guest> {
    let mut guest = store
        .guest_for_owner(user_id, guest_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if guest.qr_code.is_some() {
        return Ok(guest);
    }

    let qr_code = qr::encode_guest_pass(guest.id, guest.event_id)
        .context("generate guest qr code")?;
    store
        .set_guest_credential(guest.id, &qr_code)
        .await
        .map_err(|e| AppError::CredentialPending(e.into()))?;
    guest.qr_code = Some(qr_code);

    info!(guest_id = %guest.id, "guest credential issued");
    Ok(guest)
}
