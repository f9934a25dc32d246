use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

use super::CallContext;

/// Handler-side access to the call context.
///
/// The access middleware inserts `CallContext` into request extensions after the
/// chain succeeds. A handler mounted without the middleware gets a 401 instead of
/// running anonymously.
impl<S> FromRequestParts<S> for CallContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallContext>()
            .cloned()
            .ok_or_else(|| AppError::unauthenticated("no identity in context"))
    }
}
