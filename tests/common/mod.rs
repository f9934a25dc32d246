//! Shared fixtures: a local mock identity authority and token minting.
//!
//! The mock serves the realm discovery document, a JWKS with one HS256 `oct`
//! key, the introspection endpoint and the UMA token endpoint. It binds to
//! 127.0.0.1:0 so tests never collide on ports.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

use video_rpc_auth::config::AuthMode;
use video_rpc_auth::services::auth::InterceptorChain;
use video_rpc_auth::services::auth::authority::{AuthorityClient, AuthoritySettings};
use video_rpc_auth::services::auth::factory::compose;
use video_rpc_auth::services::auth::keys::SigningKeys;
use video_rpc_auth::services::auth::verifier::{TokenVerifier, VerifierSettings};

pub const SECRET: &[u8] = b"integration-test-signing-secret-0042";
pub const KID: &str = "test-key";
pub const REALM: &str = "videos";
pub const CLIENT_ID: &str = "video-api";
pub const CLIENT_SECRET: &str = "video-api-secret";
pub const UMA_GRANT: &str = "urn:ietf:params:oauth:grant-type:uma-ticket";

/// How the mock authority answers per-call requests.
#[derive(Debug, Clone)]
pub struct Behavior {
    /// `None` omits the `active` field entirely.
    pub active: Option<bool>,
    pub introspection_status: StatusCode,
    /// `None` answers the UMA grant with 403 access_denied.
    pub rpt: Option<String>,
    /// Advertise introspection/token endpoints on a port nobody listens on.
    pub unreachable_endpoints: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            active: Some(true),
            introspection_status: StatusCode::OK,
            rpt: Some("rpt-token-value".to_string()),
            unreachable_endpoints: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Calls {
    pub introspect: AtomicUsize,
    pub rpt: AtomicUsize,
    pub permissions: Mutex<Vec<String>>,
    pub rpt_bearers: Mutex<Vec<String>>,
    pub introspected_tokens: Mutex<Vec<String>>,
}

impl Calls {
    pub fn introspect_count(&self) -> usize {
        self.introspect.load(Ordering::SeqCst)
    }

    pub fn rpt_count(&self) -> usize {
        self.rpt.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct MockState {
    base: String,
    dead_base: String,
    behavior: Behavior,
    calls: Arc<Calls>,
}

pub struct MockAuthority {
    pub addr: SocketAddr,
    pub calls: Arc<Calls>,
}

impl MockAuthority {
    pub async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let state = MockState {
            base: format!("http://{addr}"),
            dead_base: format!("http://{}", unused_addr().await),
            behavior,
            calls: Arc::new(Calls::default()),
        };
        let calls = state.calls.clone();

        let realm = format!("/realms/{REALM}");
        let app = Router::new()
            .route(
                &format!("{realm}/.well-known/openid-configuration"),
                get(discovery),
            )
            .route(&format!("{realm}/protocol/openid-connect/certs"), get(jwks))
            .route(
                &format!("{realm}/protocol/openid-connect/token/introspect"),
                post(introspect),
            )
            .route(&format!("{realm}/protocol/openid-connect/token"), post(token))
            .with_state(state);

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, calls }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("base url")
    }

    pub fn issuer(&self) -> String {
        format!("http://{}/realms/{REALM}", self.addr)
    }

    pub fn settings(&self) -> AuthoritySettings {
        AuthoritySettings {
            base_url: self.base_url(),
            realm: REALM.to_string(),
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            audience: CLIENT_ID.to_string(),
        }
    }

    pub async fn client(&self) -> AuthorityClient {
        AuthorityClient::discover(reqwest::Client::new(), self.settings())
            .await
            .expect("discover")
    }

    /// Chain built the same way the service builds it at startup.
    pub async fn chain(&self, mode: AuthMode, permissions_enabled: bool) -> InterceptorChain {
        let authority = self.client().await;
        let keys = SigningKeys::load(&authority).await.expect("jwks");
        let verifier = TokenVerifier::new(
            Arc::new(keys),
            VerifierSettings {
                issuer: authority.issuer().to_string(),
                audience: None,
                algorithms: vec![Algorithm::HS256],
                leeway_seconds: 0,
            },
        );
        compose(mode, permissions_enabled, verifier, authority)
    }

    /// A valid token for `subject` signed with the JWKS key.
    pub fn token_for(&self, subject: &str) -> String {
        mint(json!({
            "iss": self.issuer(),
            "sub": subject,
            "exp": now() + 300,
            "iat": now(),
        }))
    }
}

async fn discovery(State(state): State<MockState>) -> Json<Value> {
    let issuer = format!("{}/realms/{REALM}", state.base);
    let per_call = if state.behavior.unreachable_endpoints {
        format!("{}/realms/{REALM}", state.dead_base)
    } else {
        issuer.clone()
    };

    Json(json!({
        "issuer": issuer,
        "jwks_uri": format!("{issuer}/protocol/openid-connect/certs"),
        "introspection_endpoint": format!("{per_call}/protocol/openid-connect/token/introspect"),
        "token_endpoint": format!("{per_call}/protocol/openid-connect/token"),
    }))
}

async fn jwks() -> Json<Value> {
    Json(json!({
        "keys": [
            {
                "kty": "oct",
                "kid": KID,
                "alg": "HS256",
                "use": "sig",
                "k": URL_SAFE_NO_PAD.encode(SECRET),
            }
        ]
    }))
}

async fn introspect(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.calls.introspect.fetch_add(1, Ordering::SeqCst);

    if form.get("client_id").map(String::as_str) != Some(CLIENT_ID)
        || form.get("client_secret").map(String::as_str) != Some(CLIENT_SECRET)
    {
        let body = Json(json!({ "error": "invalid_client" }));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }
    if let Some(token) = form.get("token") {
        state
            .calls
            .introspected_tokens
            .lock()
            .unwrap()
            .push(token.clone());
    }

    let body = match state.behavior.active {
        Some(active) => json!({ "active": active }),
        None => json!({}),
    };
    (state.behavior.introspection_status, Json(body)).into_response()
}

async fn token(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.calls.rpt.fetch_add(1, Ordering::SeqCst);

    if form.get("grant_type").map(String::as_str) != Some(UMA_GRANT)
        || form.get("audience").map(String::as_str) != Some(CLIENT_ID)
    {
        let body = Json(json!({ "error": "invalid_request" }));
        return (StatusCode::BAD_REQUEST, body).into_response();
    }

    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state
            .calls
            .rpt_bearers
            .lock()
            .unwrap()
            .push(bearer.to_string());
    }
    if let Some(permission) = form.get("permission") {
        state
            .calls
            .permissions
            .lock()
            .unwrap()
            .push(permission.clone());
    }

    match &state.behavior.rpt {
        Some(rpt) => Json(json!({ "access_token": rpt, "token_type": "Bearer" })).into_response(),
        None => (StatusCode::FORBIDDEN, Json(json!({ "error": "access_denied" }))).into_response(),
    }
}

async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    listener.local_addr().expect("addr")
}

pub fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_secs() as i64
}

pub fn mint(claims: Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_string());
    jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(SECRET)).expect("token")
}

/// POST an RPC path through `app` with an optional Authorization header.
pub async fn call(
    app: Router,
    path: &str,
    authorization: Option<&str>,
) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder().method("POST").uri(path);
    if let Some(value) = authorization {
        req = req.header(header::AUTHORIZATION, value);
    }
    let resp = app
        .oneshot(req.body(Body::empty()).expect("request"))
        .await
        .expect("response");

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, headers, body)
}
