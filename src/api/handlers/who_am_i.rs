/*
 * Responsibility
 * - POST /auth.v1.AuthService/WhoAmI
 * - chain が検証した subject / trace id をそのまま返す
 *   (identity を自分で導出しない)
 */
use axum::Json;

use crate::api::dto::who_am_i::WhoAmIResponse;
use crate::context::CallContext;

pub async fn who_am_i(ctx: CallContext) -> Json<WhoAmIResponse> {
    tracing::debug!(
        trace_id = %ctx.trace_id(),
        subject = ctx.identity().short_subject(),
        "who am i"
    );

    Json(WhoAmIResponse {
        subject: ctx.subject().to_string(),
        trace_id: ctx.trace_id().to_string(),
    })
}
