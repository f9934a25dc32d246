use std::fmt;

use jsonwebtoken::jwk::{JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};

use crate::services::auth::authority::{AuthorityClient, AuthorityError};

#[derive(Debug, thiserror::Error)]
pub enum KeySetError {
    #[error("failed to fetch signing keys: {0}")]
    Fetch(#[from] AuthorityError),
    #[error("key set contains no usable signing keys")]
    Empty,
}

/// One verification key from the authority's JWKS.
#[derive(Clone)]
pub struct SigningKey {
    kid: Option<String>,
    algorithm: Option<KeyAlgorithm>,
    decoding_key: DecodingKey,
}

impl SigningKey {
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// A key that declares `alg` only verifies tokens signed with that algorithm.
    pub fn accepts(&self, alg: Algorithm) -> bool {
        match self.algorithm {
            None => true,
            Some(key_alg) => key_algorithm_matches(key_alg, alg),
        }
    }
}

/// Read-only signing-key set, built once before serving and shared through `Arc`.
#[derive(Clone)]
pub struct SigningKeys {
    keys: Vec<SigningKey>,
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kids: Vec<_> = self.keys.iter().map(|k| k.kid()).collect();
        f.debug_struct("SigningKeys").field("kids", &kids).finish()
    }
}

impl SigningKeys {
    pub async fn load(authority: &AuthorityClient) -> Result<Self, KeySetError> {
        let jwks = authority.fetch_jwks().await?;
        Self::from_jwk_set(&jwks)
    }

    /// Keep signature keys; encryption keys and keys jsonwebtoken cannot load
    /// are skipped.
    pub fn from_jwk_set(jwks: &JwkSet) -> Result<Self, KeySetError> {
        let mut keys = Vec::with_capacity(jwks.keys.len());

        for jwk in &jwks.keys {
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                continue;
            }

            match DecodingKey::from_jwk(jwk) {
                Ok(decoding_key) => keys.push(SigningKey {
                    kid: jwk.common.key_id.clone(),
                    algorithm: jwk.common.key_algorithm,
                    decoding_key,
                }),
                Err(err) => {
                    tracing::warn!(
                        kid = ?jwk.common.key_id,
                        error = %err,
                        "skipping unusable jwk"
                    );
                }
            }
        }

        if keys.is_empty() {
            return Err(KeySetError::Empty);
        }

        tracing::info!(count = keys.len(), "signing keys loaded");
        Ok(Self { keys })
    }

    /// Key for a token header `kid`. Without a `kid` only a single-key set is
    /// unambiguous.
    pub fn find(&self, kid: Option<&str>) -> Option<&SigningKey> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid() == Some(kid)),
            None if self.keys.len() == 1 => self.keys.first(),
            None => None,
        }
    }
}

fn key_algorithm_matches(key_alg: KeyAlgorithm, alg: Algorithm) -> bool {
    matches!(
        (key_alg, alg),
        (KeyAlgorithm::HS256, Algorithm::HS256)
            | (KeyAlgorithm::HS384, Algorithm::HS384)
            | (KeyAlgorithm::HS512, Algorithm::HS512)
            | (KeyAlgorithm::ES256, Algorithm::ES256)
            | (KeyAlgorithm::ES384, Algorithm::ES384)
            | (KeyAlgorithm::RS256, Algorithm::RS256)
            | (KeyAlgorithm::RS384, Algorithm::RS384)
            | (KeyAlgorithm::RS512, Algorithm::RS512)
            | (KeyAlgorithm::PS256, Algorithm::PS256)
            | (KeyAlgorithm::PS384, Algorithm::PS384)
            | (KeyAlgorithm::PS512, Algorithm::PS512)
            | (KeyAlgorithm::EdDSA, Algorithm::EdDSA)
    )
}
