pub mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

/// All event routes need a session; the caller layers the gate on top.
pub fn router() -> Router<AppState> {
    handlers::event_routes()
}
