/*!
 * Call-scoped context
 *
 * Responsibility:
 * - The closed set of facts an interceptor publishes for one call
 *   (trace id, verified subject, raw bearer token)
 * - The extractor handlers use to read them back
 *
 * Public API:
 * - TraceId
 * - VerifiedIdentity
 * - CallContext
 */

mod core;
mod types;

pub use types::{CallContext, TraceId, VerifiedIdentity, short_subject, token_fingerprint};
