use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateEventRequest, EventDetails, EventResponse, UpdateEventRequest},
    repo::{EventChanges, EventRepo, NewEvent},
};
use crate::{
    auth::extractors::{ApiJson, CurrentUser},
    error::{AppError, AppResult},
    guests::{dto::GuestResponse, repo::GuestRepo},
    state::AppState,
};

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/:id", get(get_event).put(update_event))
}

fn require_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Event name is required".into()));
    }
    Ok(name)
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<EventResponse>>> {
    let events = state.store.events_for_owner(user.id()).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(payload): ApiJson<CreateEventRequest>,
) -> AppResult<(StatusCode, HeaderMap)> {
    let event = state
        .store
        .create_event(NewEvent {
            user_id: user.id(),
            name: require_name(&payload.name)?,
            description: payload.description.trim(),
            date_time: payload.date_time,
        })
        .await?;

    info!(event_id = %event.id, user_id = %user.id(), "event created");
    Ok((StatusCode::CREATED, location(event.id)))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EventDetails>> {
    let event = state
        .store
        .event_for_owner(user.id(), id)
        .await?
        .ok_or(AppError::NotFound)?;
    let guests = state.store.guests_for_event(event.id).await?;

    Ok(Json(EventDetails {
        event: event.into(),
        guests: guests.into_iter().map(GuestResponse::from).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateEventRequest>,
) -> AppResult<Json<EventResponse>> {
    let changes = EventChanges {
        name: payload.name.as_deref().map(require_name).transpose()?,
        description: payload.description.as_deref().map(str::trim),
        date_time: payload.date_time,
    };
    let event = state
        .store
        .update_event(user.id(), id, changes)
        .await?
        .ok_or(AppError::NotFound)?;

    info!(event_id = %event.id, "event updated");
    Ok(Json(event.into()))
}

fn location(id: Uuid) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("/api/events/{id}")) {
        headers.insert(header::LOCATION, value);
    }
    headers
}
