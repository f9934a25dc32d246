/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use crate::services::auth::InterceptorChain;

#[derive(Clone, Debug)]
pub struct AppState {
    pub chain: InterceptorChain,
}

impl AppState {
    pub fn new(chain: InterceptorChain) -> Self {
        Self { chain }
    }
}
