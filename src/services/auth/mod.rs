pub mod authority;
pub mod bearer;
pub mod chain;
pub mod factory;
pub mod introspection;
pub mod keys;
pub mod permission;
pub mod verifier;

pub use chain::{Authentication, Call, InterceptorChain, Stage};
pub use factory::build_interceptor_chain;
