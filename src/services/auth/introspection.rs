use std::fmt;

use crate::context::VerifiedIdentity;
use crate::error::AppError;
use crate::services::auth::authority::{AuthorityClient, AuthorityError};
use crate::services::auth::verifier::{TokenError, TokenVerifier};

#[derive(Debug)]
pub enum IntrospectionError {
    Token(TokenError),
    Authority(AuthorityError),
    Inactive,
}

impl fmt::Display for IntrospectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(e) => e.fmt(f),
            Self::Authority(e) => write!(f, "introspection failed: {}", e),
            Self::Inactive => write!(f, "token is not active"),
        }
    }
}

impl std::error::Error for IntrospectionError {}

impl From<TokenError> for IntrospectionError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

impl From<IntrospectionError> for AppError {
    fn from(e: IntrospectionError) -> Self {
        match e {
            IntrospectionError::Token(e) => e.into(),
            _ => AppError::unauthenticated(e.to_string()),
        }
    }
}

/// Verification plus an online "is this token still active" check.
///
/// Self-contained: it verifies the signature itself and does not rely on a
/// verifier stage having run first.
#[derive(Debug, Clone)]
pub struct TokenIntrospector {
    verifier: TokenVerifier,
    authority: AuthorityClient,
}

impl TokenIntrospector {
    pub fn new(verifier: TokenVerifier, authority: AuthorityClient) -> Self {
        Self {
            verifier,
            authority,
        }
    }

    pub async fn introspect_header(
        &self,
        header: Option<&str>,
    ) -> Result<VerifiedIdentity, IntrospectionError> {
        let identity = self.verifier.verify_header(header)?;

        let result = self
            .authority
            .introspect(identity.raw_token())
            .await
            .map_err(IntrospectionError::Authority)?;

        match result.active {
            Some(true) => Ok(identity),
            _ => Err(IntrospectionError::Inactive),
        }
    }
}
