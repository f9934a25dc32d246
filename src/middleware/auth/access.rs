//! Interceptor chain → CallContext を extensions に入れる
//!
//! - operation 名は request path から先頭の `/` を除いたもの
//!   (`video.v1.VideoService/GetVideosByKeyword`)
//! - chain が失敗した場合は next を呼ばずにエラーレスポンスを返す
//! - 成功・失敗どちらのレスポンスにも `x-trace-id` を付ける

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::context::TraceId;
use crate::services::auth::chain::{Call, InterceptorChain};

pub const TRACE_ID_HEADER: HeaderName = HeaderName::from_static("x-trace-id");

/// RPC routes に interceptor chain を掛ける。
///
/// 例：
/// ```ignore
/// let rpc = api::routes::rpc();
/// let rpc = middleware::auth::access::apply(rpc, state.chain.clone());
/// app = app.merge(rpc);
/// ```
pub fn apply<S>(router: Router<S>, chain: InterceptorChain) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // chain 自体を middleware の state として渡す (router の state とは独立)
    router.layer(middleware::from_fn_with_state(chain, access_middleware))
}

async fn access_middleware(
    State(chain): State<InterceptorChain>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = TraceId::generate();

    let operation = req.uri().path().trim_start_matches('/').to_string();
    // Non-UTF-8 header は「ヘッダなし」と同じ扱い (invalid auth header)
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let call = Call::new(operation, authorization, trace_id.clone());

    let mut resp = match chain.run(call).await.and_then(Call::into_context) {
        Ok(ctx) => {
            // middleware → extractor への受け渡し
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        resp.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    resp
}
