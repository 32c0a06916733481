use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::AppError;

/// Identity placed in request extensions by the session gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(Uuid);

impl CurrentUser {
    pub(crate) fn new(user_id: Uuid) -> Self {
        Self(user_id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only the gate inserts this; a route without the gate fails closed.
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

/// `Json` whose rejections become `AppError::Validation` (400).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn reads_identity_from_extensions() {
        let id = Uuid::new_v4();
        let mut req = Request::builder().uri("/").body(()).unwrap();
        req.extensions_mut().insert(CurrentUser::new(id));
        let (mut parts, _) = req.into_parts();
        let user = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id(), id);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let err = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
