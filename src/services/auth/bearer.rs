//! `Authorization` header parsing.

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// The value must be exactly two space-separated parts with the `Bearer` scheme
/// and a non-empty token. Anything else is rejected before any key lookup or
/// network call happens.
pub fn parse_bearer(header: Option<&str>) -> Option<&str> {
    let mut parts = header?.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?;

    if parts.next().is_some() || scheme != "Bearer" || token.is_empty() {
        return None;
    }

    Some(token)
}
