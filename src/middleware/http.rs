//! Transport-level middleware applied to every route.
//!
//! Responsibility:
//! - Access logging / request tracing (TraceLayer)
//! - Body size limit
//! - The only request deadline in the service; the interceptor chain adds none
//!   of its own, and dropping a timed-out request drops its outbound authority
//!   calls with it.

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;

pub fn apply(router: Router, config: &Config) -> Router {
    apply_with(router, config.http_timeout, config.http_body_limit_bytes)
}

pub fn apply_with(router: Router, timeout: Duration, body_limit_bytes: usize) -> Router {
    let layers = ServiceBuilder::new()
        // Make the service error `Infallible` by converting errors into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}
