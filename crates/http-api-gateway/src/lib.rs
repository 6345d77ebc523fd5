// Path: crates/http-api-gateway/src/lib.rs
#![forbid(unsafe_code)]

//! # REVID HTTP Surface
//!
//! The external API of the gateway. Request/response shapes are the
//! contract; transport concerns (timeouts, limits, shedding) live in the
//! tower layer stack. All domain failures flow through the error taxonomy:
//! handlers never pick status codes, kinds do.

mod limiter;

pub use limiter::{LimitDecision, SlidingWindow};

use anyhow::Result;
use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use subtle::ConstantTimeEq;
use tokio::sync::watch;
use tower::{
    limit::ConcurrencyLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer, BoxError,
    ServiceBuilder,
};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use revid_gateway::{IdentityGateway, VerifyRequest};
use revid_types::app::{DeviceId, KeyType, RootBytes};
use revid_types::error::{ErrorCode, ErrorKind, GatewayError};

const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

// --- Error Handling ---

/// The handler-level error: a domain failure or a surface-level rejection.
pub enum AppError {
    /// A domain failure, classified by the taxonomy.
    Gateway(GatewayError),
    /// Missing or wrong admin secret.
    Unauthorized,
    /// A limiter denied the request.
    RateLimited,
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        Self::Gateway(e)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Precondition => StatusCode::PRECONDITION_FAILED,
        ErrorKind::CryptoFailure => StatusCode::FORBIDDEN,
        ErrorKind::ChainFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Gateway(e) => {
                let kind = e.kind();
                if kind == ErrorKind::Internal {
                    tracing::error!(target: "http-api", error = %e, "internal error");
                    // Internal detail stays in the log.
                    (
                        status_for(kind),
                        "GATEWAY_INTERNAL",
                        "Internal server error".to_string(),
                    )
                } else {
                    (status_for(kind), e.code(), e.to_string())
                }
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "ADMIN_UNAUTHORIZED",
                "Missing or invalid admin secret".to_string(),
            ),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests".to_string(),
            ),
        };
        (
            status,
            Json(serde_json::json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}

// --- State ---

struct AppState {
    gateway: Arc<IdentityGateway>,
    admin_secret_digest: [u8; 32],
    device_limiter: SlidingWindow<DeviceId>,
}

/// Surface configuration, extracted from the node configuration.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Socket address to bind.
    pub listen_addr: String,
    /// Maximum request body, kilobytes.
    pub body_limit_kb: usize,
    /// Requests per source address per minute.
    pub ip_per_minute: u32,
    /// Authentication attempts per device per five minutes.
    pub device_per_5_minutes: u32,
    /// The shared admin secret.
    pub admin_secret: String,
}

fn check_admin(headers: &HeaderMap, state: &AppState) -> Result<(), AppError> {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;
    // Compare digests so equality is constant-time regardless of length.
    let provided_digest: [u8; 32] = Sha256::digest(provided.as_bytes()).into();
    if provided_digest.ct_eq(&state.admin_secret_digest).unwrap_u8() == 1 {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

// --- Middleware ---

async fn ip_rate_limit(
    State(limiter): State<Arc<SlidingWindow<IpAddr>>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));
    let decision = limiter.check(ip);
    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        AppError::RateLimited.into_response()
    };
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        response.headers_mut().insert("x-ratelimit-remaining", value);
    }
    response
}

/// Stamps every response with a request id and the security headers.
async fn decorate_response(req: Request<Body>, next: Next) -> Response {
    let mut id_bytes = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut id_bytes);
    let request_id = hex::encode(id_bytes);

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", value);
    }
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    response
}

async fn map_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(serde_json::json!({
                "error": { "code": "TIMEOUT", "message": "request timed out" }
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": { "code": "OVERLOADED", "message": err.to_string() }
            })),
        )
    }
}

// --- Request/Response Types ---

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
    db: bool,
    chain: bool,
    #[serde(rename = "contractLoaded")]
    contract_loaded: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    service: &'static str,
    version: &'static str,
    db: ComponentStatus,
    chain: ComponentStatus,
    accumulator: AccumulatorResponse,
}

#[derive(Serialize)]
struct ComponentStatus {
    ok: bool,
}

#[derive(Serialize)]
struct AccumulatorResponse {
    #[serde(rename = "rootHex")]
    root_hex: String,
    #[serde(rename = "rootHash")]
    root_hash: String,
    version: u64,
    block: u64,
    #[serde(rename = "activeDevices")]
    active_devices: u64,
}

#[derive(Deserialize)]
struct UpdateAccumulatorRequest {
    #[serde(rename = "newRootHex")]
    new_root_hex: String,
    #[serde(rename = "parentHash")]
    parent_hash: Option<String>,
}

#[derive(Serialize)]
struct UpdateAccumulatorResponse {
    #[serde(rename = "txHash")]
    tx_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: u64,
    #[serde(rename = "newRoot")]
    new_root: String,
}

#[derive(Deserialize)]
struct EnrollRequest {
    #[serde(rename = "pubkeyPem")]
    pubkey_pem: String,
    #[serde(rename = "keyType")]
    key_type: KeyType,
}

#[derive(Serialize)]
struct EnrollResponse {
    #[serde(rename = "deviceIdHex")]
    device_id_hex: String,
    #[serde(rename = "primeP")]
    prime_p: String,
    #[serde(rename = "witnessHex")]
    witness_hex: String,
    #[serde(rename = "rootHex")]
    root_hex: String,
}

#[derive(Deserialize)]
struct RevokeRequest {
    #[serde(rename = "deviceIdHex")]
    device_id_hex: String,
}

#[derive(Serialize)]
struct RevokeResponse {
    #[serde(rename = "rootHex")]
    root_hex: String,
}

#[derive(Deserialize)]
struct AuthStartRequest {
    #[serde(rename = "deviceId")]
    device_id: String,
}

#[derive(Serialize)]
struct AuthStartResponse {
    nonce: String,
    #[serde(rename = "expiresAt")]
    expires_at: u64,
}

#[derive(Deserialize)]
struct AuthVerifyRequest {
    #[serde(rename = "deviceId")]
    device_id: String,
    #[serde(rename = "primeHex")]
    prime: String,
    #[serde(rename = "witnessHex")]
    witness_hex: String,
    #[serde(rename = "signatureB64")]
    signature_b64: String,
    nonce: String,
    #[serde(rename = "pubkeyPem")]
    pubkey_pem: Option<String>,
}

#[derive(Serialize)]
struct AuthVerifyResponse {
    ok: bool,
    #[serde(rename = "newWitnessHex", skip_serializing_if = "Option::is_none")]
    new_witness_hex: Option<String>,
}

#[derive(Serialize)]
struct WitnessResponse {
    #[serde(rename = "witnessHex")]
    witness_hex: String,
    version: u64,
}

fn parse_device_id(s: &str) -> Result<DeviceId, AppError> {
    DeviceId::from_hex(s).map_err(|e| AppError::Gateway(e.into()))
}

// --- Handlers ---

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let health = state.gateway.component_health().await;
    Json(HealthResponse {
        ok: health.db && health.chain,
        service: "revid-gateway",
        version: env!("CARGO_PKG_VERSION"),
        db: health.db,
        chain: health.chain,
        contract_loaded: health.chain,
    })
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let health = state.gateway.component_health().await;
    Ok(Json(StatusResponse {
        service: "revid-gateway",
        version: env!("CARGO_PKG_VERSION"),
        db: ComponentStatus { ok: health.db },
        chain: ComponentStatus { ok: health.chain },
        accumulator: accumulator_body(&state).await?,
    }))
}

async fn accumulator_body(state: &AppState) -> Result<AccumulatorResponse, AppError> {
    let view = state.gateway.accumulator_view().await;
    let active = state.gateway.active_device_count().await?;
    Ok(AccumulatorResponse {
        root_hex: view.root_hex,
        root_hash: view.root_hash_hex,
        version: view.version,
        block: view.block,
        active_devices: active,
    })
}

async fn accumulator_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccumulatorResponse>, AppError> {
    Ok(Json(accumulator_body(&state).await?))
}

async fn accumulator_update_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateAccumulatorRequest>,
) -> Result<Json<UpdateAccumulatorResponse>, AppError> {
    check_admin(&headers, &state)?;
    let new_root = RootBytes::from_hex(&payload.new_root_hex)
        .map_err(|e| AppError::Gateway(e.into()))?;
    let parent_hash = payload
        .parent_hash
        .as_deref()
        .map(revid_types::codec::decode_hex_fixed::<32>)
        .transpose()
        .map_err(|e| AppError::Gateway(e.into()))?;

    let (root, block_number, tx_hash) =
        state.gateway.update_accumulator(new_root, parent_hash).await?;
    Ok(Json(UpdateAccumulatorResponse {
        tx_hash: hex::encode(tx_hash),
        block_number,
        new_root: root.to_hex(),
    }))
}

async fn enroll_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>, AppError> {
    check_admin(&headers, &state)?;
    let outcome = state
        .gateway
        .enroll(&payload.pubkey_pem, payload.key_type)
        .await?;
    Ok(Json(EnrollResponse {
        device_id_hex: outcome.device_id.to_string(),
        prime_p: outcome.prime,
        witness_hex: outcome.witness_hex,
        root_hex: outcome.root_hex,
    }))
}

async fn revoke_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RevokeRequest>,
) -> Result<Json<RevokeResponse>, AppError> {
    check_admin(&headers, &state)?;
    let device_id = parse_device_id(&payload.device_id_hex)?;
    let outcome = state.gateway.revoke(&device_id).await?;
    Ok(Json(RevokeResponse {
        root_hex: outcome.root_hex,
    }))
}

async fn auth_start_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AuthStartRequest>,
) -> Result<Json<AuthStartResponse>, AppError> {
    let device_id = parse_device_id(&payload.device_id)?;
    if !state.device_limiter.check(device_id).allowed {
        return Err(AppError::RateLimited);
    }
    let challenge = state.gateway.start_auth(&device_id).await?;
    Ok(Json(AuthStartResponse {
        nonce: challenge.nonce_hex,
        expires_at: challenge.expires_at,
    }))
}

async fn auth_verify_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AuthVerifyRequest>,
) -> Result<Json<AuthVerifyResponse>, AppError> {
    let device_id = parse_device_id(&payload.device_id)?;
    if !state.device_limiter.check(device_id).allowed {
        return Err(AppError::RateLimited);
    }
    let nonce = revid_types::codec::decode_hex_loose(&payload.nonce)
        .map_err(|e| AppError::Gateway(e.into()))?;
    let signature = BASE64.decode(&payload.signature_b64).map_err(|e| {
        AppError::Gateway(GatewayError::InvalidInput(format!("signature: {e}")))
    })?;

    let outcome = state
        .gateway
        .verify_auth(VerifyRequest {
            device_id,
            prime: payload.prime,
            witness_hex: payload.witness_hex,
            signature,
            nonce,
            claimed_pubkey_pem: payload.pubkey_pem,
        })
        .await?;
    Ok(Json(AuthVerifyResponse {
        ok: outcome.ok,
        new_witness_hex: outcome.new_witness_hex,
    }))
}

async fn witness_handler(
    State(state): State<Arc<AppState>>,
    Path(device_id_hex): Path<String>,
) -> Result<Json<WitnessResponse>, AppError> {
    let device_id = parse_device_id(&device_id_hex)?;
    let (witness_hex, version) = state.gateway.witness(&device_id).await?;
    Ok(Json(WitnessResponse {
        witness_hex,
        version,
    }))
}

// --- Server ---

/// Builds the application router. Exposed separately from [`run_server`]
/// so tests can drive it without a socket.
pub fn build_router(config: &HttpConfig, gateway: Arc<IdentityGateway>) -> Router {
    let state = Arc::new(AppState {
        gateway,
        admin_secret_digest: Sha256::digest(config.admin_secret.as_bytes()).into(),
        device_limiter: SlidingWindow::new(
            config.device_per_5_minutes,
            Duration::from_secs(5 * 60),
        ),
    });
    let ip_limiter = Arc::new(SlidingWindow::<IpAddr>::new(
        config.ip_per_minute,
        Duration::from_secs(60),
    ));

    Router::new()
        .route("/v1/health", get(health_handler))
        .route("/v1/status", get(status_handler))
        .route("/v1/accumulator", get(accumulator_handler))
        .route("/v1/accumulator/update", post(accumulator_update_handler))
        .route("/v1/devices/enroll", post(enroll_handler))
        .route("/v1/devices/revoke", post(revoke_handler))
        .route("/v1/auth/start", post(auth_start_handler))
        .route("/v1/auth/verify", post(auth_verify_handler))
        .route("/v1/devices/:device_id/witness", get(witness_handler))
        .route_layer(middleware::from_fn_with_state(ip_limiter, ip_rate_limit))
        .with_state(state)
        .layer(middleware::from_fn(decorate_response))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(map_middleware_error))
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(128))
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.body_limit_kb * 1024))
}

/// Serves the API until the shutdown signal flips.
pub async fn run_server(
    config: HttpConfig,
    gateway: Arc<IdentityGateway>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let app = build_router(&config, gateway);
    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!(target: "http-api", %addr, "REVID API listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_rx.changed().await.ok();
        tracing::info!(target: "http-api", "shutting down gracefully");
    });

    if let Err(e) = server.await {
        tracing::error!(target: "http-api", error = %e, "server error");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use revid_chain::InProcessChain;
    use revid_contract::{CommitmentContract, MultisigAuthority, MultisigManager};
    use revid_crypto::accumulator::{RsaParams, Trapdoor};
    use revid_gateway::GatewayConfig;
    use revid_storage::MemoryDeviceStore;
    use tower::ServiceExt;

    async fn test_gateway() -> Arc<IdentityGateway> {
        let params = RsaParams::new(BigUint::from(209u32), BigUint::from(4u32)).unwrap();
        let manager = MultisigManager::new(
            MultisigAuthority {
                address: [0xaa; 20],
                owners: vec![[1; 20], [2; 20], [3; 20]],
                threshold: 2,
            },
            [0xee; 20],
            31_337,
            [0xcc; 20],
        )
        .unwrap();
        let genesis = params.encode_element(&BigUint::from(4u32)).unwrap();
        let contract = CommitmentContract::new(genesis, manager, 0).unwrap();
        let chain = Arc::new(InProcessChain::new(contract, [0xaa; 20]));
        let store = Arc::new(MemoryDeviceStore::new());
        Arc::new(
            IdentityGateway::new(
                params,
                Trapdoor::new(BigUint::from(90u32)).unwrap(),
                store.clone(),
                store,
                chain,
                GatewayConfig {
                    nonce_ttl_seconds: 300,
                },
            )
            .await
            .unwrap(),
        )
    }

    fn test_config() -> HttpConfig {
        HttpConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            body_limit_kb: 64,
            ip_per_minute: 100,
            device_per_5_minutes: 100,
            admin_secret: "test-secret".to_string(),
        }
    }

    async fn send(
        router: Router,
        request: Request<Body>,
    ) -> (StatusCode, HeaderMap, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    #[tokio::test]
    async fn test_health_and_decoration() {
        let router = build_router(&test_config(), test_gateway().await);
        let (status, headers, body) = send(
            router,
            Request::get("/v1/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["service"], "revid-gateway");
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get("cache-control").unwrap(), "no-store");
        assert!(headers.contains_key("x-ratelimit-remaining"));
    }

    #[tokio::test]
    async fn test_admin_secret_gates_enrollment() {
        let gateway = test_gateway().await;
        let payload = serde_json::json!({
            "pubkeyPem": "irrelevant",
            "keyType": "ed25519",
        })
        .to_string();

        // Missing secret.
        let router = build_router(&test_config(), gateway.clone());
        let (status, _, body) = send(
            router,
            Request::post("/v1/devices/enroll")
                .header("content-type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "ADMIN_UNAUTHORIZED");

        // Wrong secret.
        let router = build_router(&test_config(), gateway.clone());
        let (status, _, _) = send(
            router,
            Request::post("/v1/devices/enroll")
                .header("content-type", "application/json")
                .header(ADMIN_SECRET_HEADER, "wrong")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Right secret, bad key: the request reaches the domain and fails
        // there instead.
        let router = build_router(&test_config(), gateway);
        let (status, _, body) = send(
            router,
            Request::post("/v1/devices/enroll")
                .header("content-type", "application/json")
                .header(ADMIN_SECRET_HEADER, "test-secret")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "CRYPTO_INVALID_KEY");
    }

    #[tokio::test]
    async fn test_unknown_device_maps_to_not_found() {
        let router = build_router(&test_config(), test_gateway().await);
        let payload = serde_json::json!({ "deviceId": hex::encode([0x42u8; 32]) }).to_string();
        let (status, _, body) = send(
            router,
            Request::post("/v1/auth/start")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "DEVICE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_device_id_is_bad_request() {
        let router = build_router(&test_config(), test_gateway().await);
        let payload = serde_json::json!({ "deviceId": "zz" }).to_string();
        let (status, _, body) = send(
            router,
            Request::post("/v1/auth/start")
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CODEC_BAD_HEX");
    }

    #[tokio::test]
    async fn test_accumulator_read() {
        let router = build_router(&test_config(), test_gateway().await);
        let (status, _, body) = send(
            router,
            Request::get("/v1/accumulator").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 1);
        assert_eq!(body["activeDevices"], 0);
        // Genesis root is g = 4, 256-byte big-endian.
        let root_hex = body["rootHex"].as_str().unwrap();
        assert_eq!(root_hex.len(), 512);
        assert!(root_hex.ends_with("04"));
    }

    #[tokio::test]
    async fn test_device_rate_limit() {
        let mut config = test_config();
        config.device_per_5_minutes = 2;
        // The limiter lives in the router's state: build once, clone per
        // request, or the window resets between calls.
        let router = build_router(&config, test_gateway().await);
        let device_id_hex = hex::encode([0x42u8; 32]);

        for attempt in 0..3 {
            let payload = serde_json::json!({ "deviceId": device_id_hex }).to_string();
            let (status, _, _) = send(
                router.clone(),
                Request::post("/v1/auth/start")
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await;
            if attempt < 2 {
                assert_eq!(status, StatusCode::NOT_FOUND);
            } else {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            }
        }
    }
}
