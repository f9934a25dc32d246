/*
 * Responsibility
 * - URL 構造を定義
 * - public (chain なし) と rpc (chain 必須) を分ける
 * - rpc 側への chain の適用は app.rs で middleware::auth::access::apply を使う
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{health::health, who_am_i::who_am_i};

pub fn public() -> Router {
    Router::new().route("/health", get(health))
}

pub fn rpc() -> Router {
    Router::new().route("/auth.v1.AuthService/WhoAmI", post(who_am_i))
}
