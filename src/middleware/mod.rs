/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth::access (interceptor chain), http (transport layers), cors
 */
pub mod auth;
pub mod cors;
pub mod http;
