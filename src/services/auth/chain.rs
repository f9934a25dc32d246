//! Interceptor chain: ordered identity / authorization stages with first-failure
//! short-circuit.
//!
//! Per call: `Authenticating | Introspecting → [Authorizing] → Forwarded`.
//! A failed stage ends the call; nothing after it runs and the wrapped handler
//! is never reached. No stage retries.

use std::{fmt, sync::Arc};

use crate::context::{CallContext, TraceId, VerifiedIdentity, token_fingerprint};
use crate::error::AppError;
use crate::services::auth::bearer::parse_bearer;
use crate::services::auth::introspection::TokenIntrospector;
use crate::services::auth::permission::{PermissionChecker, ResourceMap};
use crate::services::auth::verifier::TokenVerifier;

/// Transport-independent view of one inbound call as it moves through the chain.
#[derive(Clone)]
pub struct Call {
    operation: String,
    authorization: Option<String>,
    trace_id: TraceId,
    identity: Option<VerifiedIdentity>,
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The authorization header holds the raw token
        f.debug_struct("Call")
            .field("operation", &self.operation)
            .field("trace_id", &self.trace_id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl Call {
    pub fn new(
        operation: impl Into<String>,
        authorization: Option<String>,
        trace_id: TraceId,
    ) -> Self {
        Self {
            operation: operation.into(),
            authorization,
            trace_id,
            identity: None,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn identity(&self) -> Option<&VerifiedIdentity> {
        self.identity.as_ref()
    }

    /// Context handed to the next handler. Requires an identity stage to have
    /// succeeded.
    pub fn into_context(self) -> Result<CallContext, AppError> {
        match self.identity {
            Some(identity) => Ok(CallContext::new(self.trace_id, identity)),
            None => Err(AppError::internal("chain finished without an identity")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authenticating,
    Introspecting,
    Authorizing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Authenticating => "authenticating",
            Phase::Introspecting => "introspecting",
            Phase::Authorizing => "authorizing",
        }
    }
}

/// One step of the chain.
#[derive(Debug, Clone)]
pub enum Stage {
    Verify(TokenVerifier),
    Introspect(TokenIntrospector),
    Authorize {
        resources: ResourceMap,
        checker: PermissionChecker,
    },
}

impl Stage {
    pub fn phase(&self) -> Phase {
        match self {
            Stage::Verify(_) => Phase::Authenticating,
            Stage::Introspect(_) => Phase::Introspecting,
            Stage::Authorize { .. } => Phase::Authorizing,
        }
    }

    /// Run this stage once: enrich the call or fail it.
    pub async fn attempt(&self, call: &mut Call) -> Result<(), AppError> {
        match self {
            Stage::Verify(verifier) => {
                let identity = verifier.verify_header(call.authorization.as_deref())?;
                call.identity = Some(identity);
            }
            Stage::Introspect(introspector) => {
                let identity = introspector
                    .introspect_header(call.authorization.as_deref())
                    .await?;
                call.identity = Some(identity);
            }
            Stage::Authorize { resources, checker } => {
                let token = call
                    .identity
                    .as_ref()
                    .map(VerifiedIdentity::raw_token)
                    .ok_or_else(|| AppError::unauthenticated("no token in context"))?;
                let resource = resources.resolve(&call.operation)?;
                checker.check(token, resource).await?;
            }
        }
        Ok(())
    }
}

/// Which identity stage leads the chain. Introspection already verifies the
/// signature, so the two are alternatives, never both.
#[derive(Debug, Clone)]
pub enum Authentication {
    Verify(TokenVerifier),
    Introspect(TokenIntrospector),
}

impl From<Authentication> for Stage {
    fn from(authn: Authentication) -> Self {
        match authn {
            Authentication::Verify(verifier) => Stage::Verify(verifier),
            Authentication::Introspect(introspector) => Stage::Introspect(introspector),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterceptorChain {
    stages: Arc<[Stage]>,
}

impl InterceptorChain {
    /// Identity-only chain.
    pub fn authenticate(authn: Authentication) -> Self {
        Self {
            stages: Arc::from(vec![Stage::from(authn)]),
        }
    }

    /// Identity stage followed by the per-operation permission check.
    pub fn authenticate_and_authorize(
        authn: Authentication,
        resources: ResourceMap,
        checker: PermissionChecker,
    ) -> Self {
        Self {
            stages: Arc::from(vec![
                Stage::from(authn),
                Stage::Authorize { resources, checker },
            ]),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Drive the call through every stage in order, stopping at the first failure.
    pub async fn run(&self, mut call: Call) -> Result<Call, AppError> {
        for stage in self.stages.iter() {
            let phase = stage.phase();

            if let Err(err) = stage.attempt(&mut call).await {
                let token = parse_bearer(call.authorization.as_deref()).map(token_fingerprint);
                let subject = call
                    .identity
                    .as_ref()
                    .map(VerifiedIdentity::short_subject)
                    .unwrap_or("-");
                tracing::warn!(
                    trace_id = %call.trace_id,
                    operation = %call.operation,
                    phase = phase.as_str(),
                    code = err.code(),
                    cause = err.cause(),
                    subject,
                    token = token.as_deref().unwrap_or("-"),
                    "call rejected"
                );
                return Err(err);
            }

            tracing::debug!(
                trace_id = %call.trace_id,
                operation = %call.operation,
                phase = phase.as_str(),
                "stage passed"
            );
        }

        if let Some(identity) = &call.identity {
            tracing::info!(
                trace_id = %call.trace_id,
                operation = %call.operation,
                subject = identity.short_subject(),
                token = %identity.token_fingerprint(),
                "call forwarded"
            );
        }

        Ok(call)
    }
}
