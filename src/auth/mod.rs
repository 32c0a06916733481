use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;

/// Public auth endpoints: register, login, logout.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Endpoints that need a session; the caller layers the gate on top.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
