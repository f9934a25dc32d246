/*
 * Responsibility
 * - Types for the facts that flow from the interceptor chain to handlers
 * - Values are owned per call and dropped with the request
 *
 * Notes
 * - The raw token is kept only so later stages (and downstream clients) can
 *   forward it; it is never printed by Debug or Display
 */
use std::fmt;

use sha2::{Digest, Sha256};
use uuid::Uuid;

const FINGERPRINT_BYTES: usize = 6;
const SUBJECT_PREFIX_CHARS: usize = 8;

/// Per-call correlation id, minted fresh for every inbound call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity proven by a verification stage during this call.
///
/// Only the auth services construct it, after the token passed signature and
/// expiry checks.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    subject: String,
    raw_token: String,
}

impl VerifiedIdentity {
    pub(crate) fn new(subject: String, raw_token: String) -> Self {
        Self { subject, raw_token }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The bearer token exactly as received. Forward it, never log it.
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }

    /// Truncated subject for log fields.
    pub fn short_subject(&self) -> &str {
        short_subject(&self.subject)
    }

    pub fn token_fingerprint(&self) -> String {
        token_fingerprint(&self.raw_token)
    }
}

impl fmt::Debug for VerifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the token
        f.debug_struct("VerifiedIdentity")
            .field("subject", &self.subject)
            .field("token", &self.token_fingerprint())
            .finish()
    }
}

/// Everything a downstream handler may know about the caller.
#[derive(Debug, Clone)]
pub struct CallContext {
    trace_id: TraceId,
    identity: VerifiedIdentity,
}

impl CallContext {
    pub fn new(trace_id: TraceId, identity: VerifiedIdentity) -> Self {
        Self { trace_id, identity }
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn subject(&self) -> &str {
        self.identity.subject()
    }

    pub fn raw_token(&self) -> &str {
        self.identity.raw_token()
    }

    pub fn identity(&self) -> &VerifiedIdentity {
        &self.identity
    }
}

/// Short non-reversible token id: hex of the first bytes of SHA-256(token).
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..FINGERPRINT_BYTES]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub fn short_subject(subject: &str) -> &str {
    match subject.char_indices().nth(SUBJECT_PREFIX_CHARS) {
        Some((idx, _)) => &subject[..idx],
        None => subject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_ids_are_fresh() {
        let a = TraceId::generate();
        let b = TraceId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn debug_never_prints_the_token() {
        let identity = VerifiedIdentity::new("user-42".into(), "secret.jwt.value".into());
        let printed = format!("{identity:?}");
        assert!(printed.contains("user-42"));
        assert!(!printed.contains("secret.jwt.value"));
        assert!(printed.contains(&token_fingerprint("secret.jwt.value")));
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let fp = token_fingerprint("abc");
        assert_eq!(fp, token_fingerprint("abc"));
        assert_eq!(fp.len(), FINGERPRINT_BYTES * 2);
        assert_ne!(fp, token_fingerprint("abd"));
    }

    #[test]
    fn short_subject_truncates_on_char_boundary() {
        assert_eq!(short_subject("user-42"), "user-42");
        assert_eq!(
            short_subject("0f8fad5b-d9cb-469f-a165-70867728950e"),
            "0f8fad5b"
        );
        assert_eq!(short_subject("ユーザー12345678"), "ユーザー1234");
    }
}
