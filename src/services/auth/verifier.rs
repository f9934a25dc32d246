use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;
use std::{fmt, sync::Arc};

use crate::context::VerifiedIdentity;
use crate::error::AppError;
use crate::services::auth::bearer::parse_bearer;
use crate::services::auth::keys::SigningKeys;

// Errors returned by bearer parsing + token verification + subject extraction.
#[derive(Debug)]
pub enum TokenError {
    InvalidHeader,
    UnsupportedAlgorithm(Algorithm),
    UnknownKey(Option<String>),
    Jwt(jsonwebtoken::errors::Error),
    Subject(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader => write!(f, "invalid auth header"),
            Self::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm {:?}", alg),
            Self::UnknownKey(Some(kid)) => write!(f, "no signing key for kid '{}'", kid),
            Self::UnknownKey(None) => write!(f, "token has no kid and key set is ambiguous"),
            Self::Jwt(e) => write!(f, "jwt verification failed: {}", e),
            Self::Subject(cause) => write!(f, "subject claim: {}", cause),
        }
    }
}

impl std::error::Error for TokenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            // A token that verified but has no usable subject is a config/programming
            // problem on the authority side, not a caller error.
            TokenError::Subject(_) => AppError::internal(e.to_string()),
            _ => AppError::unauthenticated(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubjectClaim {
    sub: String,
}

/// Validation knobs for access tokens.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    pub issuer: String,
    /// When set, `aud` must contain it.
    pub audience: Option<String>,
    pub algorithms: Vec<Algorithm>,
    pub leeway_seconds: u64,
}

/// Signature/expiry verifier against the authority's published keys.
///
/// Holds no per-call state: verifying the same token twice gives the same result.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<SigningKeys>,
    settings: Arc<VerifierSettings>,
}

impl TokenVerifier {
    pub fn new(keys: Arc<SigningKeys>, settings: VerifierSettings) -> Self {
        Self {
            keys,
            settings: Arc::new(settings),
        }
    }

    /// Parse `Authorization: Bearer <token>` and verify the token.
    pub fn verify_header(&self, header: Option<&str>) -> Result<VerifiedIdentity, TokenError> {
        let token = parse_bearer(header).ok_or(TokenError::InvalidHeader)?;
        self.verify(token)
    }

    /// Verify signature, expiry and issuer, then extract `sub`.
    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity, TokenError> {
        let header = jsonwebtoken::decode_header(token)?;
        if !self.settings.algorithms.contains(&header.alg) {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let key = self
            .keys
            .find(header.kid.as_deref())
            .filter(|key| key.accepts(header.alg))
            .ok_or_else(|| TokenError::UnknownKey(header.kid.clone()))?;

        let data = jsonwebtoken::decode::<serde_json::Value>(
            token,
            key.decoding_key(),
            &self.validation(header.alg),
        )?;

        let subject = extract_subject(data.claims)?;
        Ok(VerifiedIdentity::new(subject, token.to_string()))
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let settings = &self.settings;
        let mut validation = Validation::new(alg);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation
            .required_spec_claims
            .extend(["exp".to_string(), "iss".to_string()]);
        match &settings.audience {
            Some(audience) => validation.set_audience(&[audience.as_str()]),
            None => validation.validate_aud = false,
        }
        validation.validate_nbf = true;
        validation.leeway = settings.leeway_seconds;
        validation
    }
}

fn extract_subject(claims: serde_json::Value) -> Result<String, TokenError> {
    let claim: SubjectClaim =
        serde_json::from_value(claims).map_err(|e| TokenError::Subject(e.to_string()))?;
    if claim.sub.trim().is_empty() {
        return Err(TokenError::Subject("empty 'sub'".to_string()));
    }
    Ok(claim.sub)
}
