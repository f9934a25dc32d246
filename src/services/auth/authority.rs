//! HTTP client for the identity authority (Keycloak-style realm layout).
//!
//! Discovery and JWKS are fetched once at startup. Introspection and the UMA
//! ticket grant run per call; their futures belong to the inbound request, so
//! dropping the request drops the outbound call too.

use std::{fmt, sync::Arc};

use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const UMA_TICKET_GRANT: &str = "urn:ietf:params:oauth:grant-type:uma-ticket";

#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("issuer mismatch: expected {expected}, discovered {discovered}")]
    IssuerMismatch {
        expected: String,
        discovered: String,
    },
}

/// Static settings for talking to the authority.
#[derive(Clone)]
pub struct AuthoritySettings {
    pub base_url: Url,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    /// Resource server the UMA ticket is requested for.
    pub audience: String,
}

impl fmt::Debug for AuthoritySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthoritySettings")
            .field("base_url", &self.base_url.as_str())
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl AuthoritySettings {
    /// `{base}/realms/{realm}`, the issuer every token must carry.
    pub fn issuer_url(&self) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/realms/{}", self.realm))
    }

    pub fn discovery_url(&self) -> Result<Url, url::ParseError> {
        let issuer = self.issuer_url()?;
        Url::parse(&format!(
            "{}/.well-known/openid-configuration",
            issuer.as_str().trim_end_matches('/')
        ))
    }
}

/// Subset of the OpenID provider metadata this service uses.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityMetadata {
    pub issuer: String,
    pub jwks_uri: String,
    pub introspection_endpoint: String,
    pub token_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionResponse {
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RptResponse {
    #[serde(default)]
    pub access_token: String,
}

#[derive(Clone)]
pub struct AuthorityClient {
    http: Client,
    inner: Arc<Inner>,
}

struct Inner {
    settings: AuthoritySettings,
    metadata: AuthorityMetadata,
}

impl fmt::Debug for AuthorityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityClient")
            .field("settings", &self.inner.settings)
            .field("metadata", &self.inner.metadata)
            .finish()
    }
}

impl AuthorityClient {
    /// Fetch the realm's discovery document and pin its endpoints.
    ///
    /// Fails when the discovered issuer is not the one derived from settings.
    pub async fn discover(
        http: Client,
        settings: AuthoritySettings,
    ) -> Result<Self, AuthorityError> {
        let expected = settings.issuer_url()?;
        let metadata: AuthorityMetadata = http
            .get(settings.discovery_url()?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if metadata.issuer.trim_end_matches('/') != expected.as_str().trim_end_matches('/') {
            return Err(AuthorityError::IssuerMismatch {
                expected: expected.to_string(),
                discovered: metadata.issuer,
            });
        }

        tracing::info!(
            issuer = %metadata.issuer,
            jwks_uri = %metadata.jwks_uri,
            "authority discovered"
        );

        Ok(Self {
            http,
            inner: Arc::new(Inner { settings, metadata }),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.inner.metadata.issuer
    }

    pub fn realm(&self) -> &str {
        &self.inner.settings.realm
    }

    pub fn audience(&self) -> &str {
        &self.inner.settings.audience
    }

    pub async fn fetch_jwks(&self) -> Result<JwkSet, AuthorityError> {
        let jwks = self
            .http
            .get(&self.inner.metadata.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(jwks)
    }

    /// RFC 7662 token introspection, authenticated with the client credentials.
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResponse, AuthorityError> {
        let settings = &self.inner.settings;
        let resp = self
            .http
            .post(&self.inner.metadata.introspection_endpoint)
            .form(&[
                ("token", token),
                ("token_type_hint", "access_token"),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }

    /// UMA ticket grant: ask for an RPT proving the caller holds `resource`.
    pub async fn request_rpt(
        &self,
        token: &str,
        resource: &str,
    ) -> Result<RptResponse, AuthorityError> {
        let resp = self
            .http
            .post(&self.inner.metadata.token_endpoint)
            .bearer_auth(token)
            .form(&[
                ("grant_type", UMA_TICKET_GRANT),
                ("audience", self.audience()),
                ("permission", resource),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }
}
