use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use super::{extractors::CurrentUser, jwt::JwtKeys};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "token";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, PartialEq, Eq)]
enum Session {
    Missing,
    Invalid,
    Valid(CurrentUser),
}

/// Cookie first, then `Authorization: Bearer`.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_owned());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn resolve(keys: &JwtKeys, headers: &HeaderMap) -> Session {
    let Some(token) = session_token(headers) else {
        return Session::Missing;
    };
    match keys.verify(&token) {
        Ok(claims) => Session::Valid(CurrentUser::new(claims.sub)),
        Err(e) => {
            debug!(error = %e, "session token rejected");
            Session::Invalid
        }
    }
}

/// Gate for `/api/*`: no token or a bad one is a 401.
pub async fn require_api_session(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve(&keys, req.headers()) {
        Session::Valid(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Session::Missing | Session::Invalid => AppError::Unauthorized.into_response(),
    }
}

/// Gate for browser pages: no token sends the user to the login page and back.
pub async fn require_page_session(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve(&keys, req.headers()) {
        Session::Valid(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Session::Missing => {
            debug!(path = %req.uri().path(), "no session, redirecting to login");
            login_redirect(req.uri().path())
        }
        Session::Invalid => AppError::Unauthorized.into_response(),
    }
}

pub fn login_redirect(return_to: &str) -> Response {
    let encoded: String = url::form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
    let location = format!("{LOGIN_PATH}?return_to={encoded}");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Only local absolute paths are followed after login; anything else goes home.
///
/// Browsers drop tab, CR and LF while parsing a URL, so `/\t/host` would be
/// read as `//host`. Any control character therefore disqualifies the path.
pub fn safe_return_to(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(p)
            if p.starts_with('/')
                && !p.starts_with("//")
                && !p.contains('\\')
                && !p.chars().any(char::is_control) =>
        {
            p.to_owned()
        }
        _ => "/".to_owned(),
    }
}
