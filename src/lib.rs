//! Authentication & authorization interceptor chain for the video RPC API.
//!
//! Every RPC passes through [`services::auth::InterceptorChain`] before a
//! handler runs. Handlers read the verified caller through
//! [`context::CallContext`].

pub mod api;
pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
