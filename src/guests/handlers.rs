use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateGuestRequest, GuestResponse},
    repo::GuestRepo,
    services::{self, GuestInput},
};
use crate::{
    auth::{
        extractors::{ApiJson, CurrentUser},
        handlers::{is_valid_email, normalize_email},
    },
    error::{AppError, AppResult},
    qr::GuestPass,
    state::AppState,
};

pub fn guest_routes() -> Router<AppState> {
    Router::new()
        .route("/api/guests", post(create_guest))
        .route("/api/guests/:id", get(get_guest))
        .route("/api/guests/:id/credential", post(issue_credential))
        .route("/api/check-in", post(check_in))
}

#[instrument(skip(state, payload))]
pub async fn create_guest(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(payload): ApiJson<CreateGuestRequest>,
) -> AppResult<(StatusCode, HeaderMap)> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);
    if name.is_empty() {
        return Err(AppError::Validation("Guest name is required".into()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }

    let guest = services::create_guest(
        state.store.as_ref(),
        user.id(),
        GuestInput {
            event_id: payload.event_id,
            name,
            email: &email,
        },
    )
    .await?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("/api/guests/{}", guest.id)) {
        headers.insert(header::LOCATION, value);
    }
    Ok((StatusCode::CREATED, headers))
}

#[instrument(skip(state))]
pub async fn get_guest(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GuestResponse>> {
    let guest = state
        .store
        .guest_for_owner(user.id(), id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(guest.into()))
}

/// Reissues a credential that a failed create left out.
#[instrument(skip(state))]
pub async fn issue_credential(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GuestResponse>> {
    let guest = services::ensure_credential(state.store.as_ref(), user.id(), id).await?;
    Ok(Json(guest.into()))
}

/// Body is the scanned guest pass.
#[instrument(skip(state))]
pub async fn check_in(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(pass): ApiJson<GuestPass>,
) -> AppResult<Json<GuestResponse>> {
    let guest = state
        .store
        .mark_attended(user.id(), pass.event_id, pass.guest_id)
        .await?
        .ok_or(AppError::NotFound)?;

    info!(guest_id = %guest.id, event_id = %guest.event_id, "guest checked in");
    Ok(Json(guest.into()))
}
