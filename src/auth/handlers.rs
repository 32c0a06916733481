use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use super::{
    dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
    extractors::{ApiJson, CurrentUser},
    gate::{safe_return_to, LOGIN_PATH, SESSION_COOKIE},
    jwt::JwtKeys,
    repo::{NewUser, UserRepo},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/logout", get(logout).post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/api/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<StatusCode> {
    let email = normalize_email(&payload.email);
    let name = payload.name.trim();

    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("Password too short".into()));
    }

    let hash = state.hasher.hash(payload.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            name,
            email: &email,
            password_hash: &hash,
        })
        .await
        .map_err(|e| {
            warn!(email = %email, error = %e, "create user failed");
            AppError::from(e)
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(StatusCode::CREATED)
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let email = normalize_email(&payload.email);

    let user = state.store.user_by_email(&email).await?;
    let hash = user.as_ref().map(|u| u.password_hash.clone());
    let ok = state.hasher.verify(payload.password, hash).await?;

    let user = match user {
        Some(u) if ok => u,
        _ => {
            warn!(email = %email, "login rejected");
            return Err(AppError::InvalidCredentials);
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.issue(user.id).map_err(anyhow::Error::from)?;
    let cookie = session_cookie(token, keys.ttl(), state.config.cookie_secure);

    info!(user_id = %user.id, "user logged in");
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            redirect: safe_return_to(payload.return_to.as_deref()),
        }),
    ))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let expired = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::now_utc() - Duration::hours(1));
    (
        jar.add(expired),
        (
            StatusCode::FOUND,
            [(axum::http::header::LOCATION, LOGIN_PATH)],
        ),
    )
        .into_response()
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<PublicUser>> {
    // A valid token for a user that no longer exists is still unauthorized.
    let user = state
        .store
        .user_by_id(user.id())
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(ttl)
        .expires(OffsetDateTime::now_utc() + ttl)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("alice example.com"));
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn session_cookie_is_http_only_and_path_scoped() {
        let cookie = session_cookie("abc".into(), Duration::hours(24), false);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::hours(24)));
        assert_eq!(cookie.secure(), Some(false));
    }

    #[test]
    fn public_user_serialization() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("alice@example.com"));
        assert!(!json.contains("password"));
    }
}
