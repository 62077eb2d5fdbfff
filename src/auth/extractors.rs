use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::session::Session;

/// The request's session context. A missing, unknown or unreadable record
/// yields an anonymous session; only a router without the session layer
/// rejects.
pub struct CurrentSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let handle = tower_sessions::Session::from_request_parts(parts, state).await?;
        Ok(CurrentSession(Session::load(handle).await))
    }
}
