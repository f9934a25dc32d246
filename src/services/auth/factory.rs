//! Factory: build the interceptor chain from application `Config`.
//!
//! Runs once before the listener binds. Discovery and the JWKS fetch happen
//! here; afterwards the key set is read-only.
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{AuthMode, Config};
use crate::services::auth::authority::{AuthorityClient, AuthoritySettings};
use crate::services::auth::chain::{Authentication, InterceptorChain};
use crate::services::auth::introspection::TokenIntrospector;
use crate::services::auth::keys::SigningKeys;
use crate::services::auth::permission::{PermissionChecker, ResourceMap};
use crate::services::auth::verifier::{TokenVerifier, VerifierSettings};

pub async fn build_interceptor_chain(config: &Config) -> Result<InterceptorChain> {
    let http = reqwest::Client::builder()
        .build()
        .context("build authority http client")?;

    let settings = AuthoritySettings {
        base_url: config.auth_base_url.clone(),
        realm: config.auth_realm.clone(),
        client_id: config.auth_client_id.clone(),
        client_secret: config.auth_client_secret.clone(),
        audience: config.auth_audience.clone(),
    };

    let authority = AuthorityClient::discover(http, settings)
        .await
        .context("discover identity authority")?;

    let keys = SigningKeys::load(&authority)
        .await
        .context("load signing keys")?;

    let verifier = TokenVerifier::new(
        Arc::new(keys),
        VerifierSettings {
            issuer: authority.issuer().to_string(),
            audience: config.auth_token_audience.clone(),
            algorithms: config.auth_allowed_algorithms.clone(),
            leeway_seconds: config.access_token_leeway_seconds,
        },
    );

    Ok(compose(
        config.auth_mode,
        config.auth_permissions_enabled,
        verifier,
        authority,
    ))
}

/// Introspection already verifies signatures, so the chain gets one identity
/// stage or the other.
pub fn compose(
    mode: AuthMode,
    permissions_enabled: bool,
    verifier: TokenVerifier,
    authority: AuthorityClient,
) -> InterceptorChain {
    let authn = match mode {
        AuthMode::Verify => Authentication::Verify(verifier),
        AuthMode::Introspect => {
            Authentication::Introspect(TokenIntrospector::new(verifier, authority.clone()))
        }
    };

    tracing::info!(
        mode = ?mode,
        permissions_enabled,
        realm = authority.realm(),
        "interceptor chain configured"
    );

    if permissions_enabled {
        InterceptorChain::authenticate_and_authorize(
            authn,
            ResourceMap::default(),
            PermissionChecker::new(authority),
        )
    } else {
        InterceptorChain::authenticate(authn)
    }
}
