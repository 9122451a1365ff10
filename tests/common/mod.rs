// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test support: an in-process stub of the Fortune K.I backend.
//!
//! The stub speaks the real envelope (`{code, message, data}`) and honors a
//! few toggles so tests can force auth rejections, envelope failures and
//! the string-vs-numeric `code` spelling.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use fortune_ki::store::TokenStore;
use fortune_ki::{Config, SessionController};

pub const ACCESS_TOKEN: &str = "stub-access-token";
pub const REFRESH_TOKEN: &str = "stub-refresh-token";

/// Mutable knobs and call recorders shared with the test body.
#[derive(Default)]
pub struct StubState {
    pub login_calls: AtomicU32,
    pub logout_calls: AtomicU32,
    /// Respond to login with a failure envelope
    pub fail_login: AtomicBool,
    /// Respond 401 to every authenticated endpoint
    pub reject_auth: AtomicBool,
    /// Respond 403 instead of 401
    pub forbid_auth: AtomicBool,
    /// Spell the envelope code as the string "200"
    pub code_as_string: AtomicBool,
    /// Respond 500 to the statistics endpoint
    pub fail_statistics: AtomicBool,
    /// Respond 500 to every per-result detail endpoint
    pub fail_details: AtomicBool,
    /// Entries served by the history index endpoint
    pub index_entries: Mutex<Vec<Value>>,
    /// Recorded PUT uploads: (path, byte length, request carried a bearer)
    pub uploads: Mutex<Vec<(String, usize, bool)>>,
    pub deleted_users: Mutex<Vec<String>>,
    pub blacklisted_users: Mutex<Vec<String>>,
    pub expired_users: Mutex<Vec<String>>,
    pub granted_free: Mutex<Vec<(String, u32)>>,
}

pub struct StubBackend {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
}

impl StubBackend {
    #[allow(dead_code)]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    #[allow(dead_code)]
    pub fn config(&self) -> Config {
        test_config(self.addr)
    }
}

/// Initialize tracing once for the whole test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .try_init();
    });
}

/// Spawn the stub backend on an ephemeral port.
pub async fn spawn_stub() -> StubBackend {
    init_tracing();

    let state = Arc::new(StubState::default());
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    StubBackend { addr, state }
}

pub fn test_config(addr: SocketAddr) -> Config {
    Config {
        api_base: format!("http://{}", addr),
        // Unused by in-memory stores; points somewhere harmless regardless
        storage_dir: PathBuf::from(std::env::temp_dir()).join("fortune-ki-tests"),
    }
}

/// Controller wired to the stub with a fresh in-memory token store.
#[allow(dead_code)]
pub fn controller(backend: &StubBackend) -> (SessionController, TokenStore) {
    let store = TokenStore::in_memory();
    let controller = SessionController::new(&test_config(backend.addr), store.clone());
    (controller, store)
}

#[allow(dead_code)]
pub fn seed_index_entry(state: &StubState, result_type: &str, result_id: &str, created_at: &str) {
    state.index_entries.lock().unwrap().push(json!({
        "resultType": result_type,
        "resultId": result_id,
        "createdAt": created_at,
    }));
}

// ─── Router ──────────────────────────────────────────────────────────────────

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/security/email/login", post(login))
        .route("/api/security/common/logout", post(logout))
        .route("/api/user", post(signup))
        .route("/api/fortune/statistics", get(statistics))
        .route("/api/fortune/statistics/findAll", get(result_index))
        .route("/api/info/me", get(profile_name))
        .route("/api/fortune/face/picture", post(presign))
        .route("/api/fortune/face/{id}", get(face_detail))
        .route("/api/fortune/dream/{id}", get(dream_detail))
        .route("/api/fortune/daily/{id}", get(daily_detail))
        .route("/api/fortune/total/{id}", get(life_detail))
        .route("/api/fortune/face", post(analyze_face))
        .route("/api/fortune/dream", post(compute_dream))
        .route("/api/fortune/daily", post(compute_daily))
        .route("/api/fortune/total", post(compute_life))
        .route("/upload/{*path}", put(upload))
        .route("/admin/users", get(admin_users))
        .route("/admin/user", post(admin_user_detail).delete(admin_delete_user))
        .route("/admin/blacklist", post(admin_blacklist))
        .route("/admin/refresh-expired", post(admin_expire))
        .route("/admin/add-free-fortune/{count}", post(admin_grant))
        .with_state(state)
}

fn success_code(state: &StubState) -> Value {
    if state.code_as_string.load(Ordering::SeqCst) {
        json!("200")
    } else {
        json!(200)
    }
}

fn envelope(state: &StubState, data: Value) -> Json<Value> {
    Json(json!({ "code": success_code(state), "message": "OK", "data": data }))
}

/// 401/403 toggles plus bearer verification for authenticated endpoints.
fn authorize(state: &StubState, headers: &HeaderMap) -> Result<(), StatusCode> {
    if state.reject_auth.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if state.forbid_auth.load(Ordering::SeqCst) {
        return Err(StatusCode::FORBIDDEN);
    }
    let expected = format!("Bearer {}", ACCESS_TOKEN);
    match headers.get("authorization").and_then(|h| h.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn login(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Json<Value> {
    state.login_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_login.load(Ordering::SeqCst) {
        return Json(json!({
            "code": 401,
            "message": "이메일 또는 비밀번호가 올바르지 않습니다.",
            "data": null
        }));
    }

    assert!(body.get("email").is_some() && body.get("password").is_some());
    envelope(
        &state,
        json!({ "accessToken": ACCESS_TOKEN, "refreshToken": REFRESH_TOKEN }),
    )
}

async fn logout(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    Ok(envelope(&state, json!("ok")))
}

async fn signup(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Json<Value> {
    assert!(body.get("birthTime").is_some());
    envelope(&state, json!("user-777"))
}

async fn statistics(
    State(state): State<Arc<StubState>>,
) -> Result<Json<Value>, StatusCode> {
    if state.fail_statistics.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(envelope(
        &state,
        json!({
            "totalUsers": 1000,
            "faceResultCount": 10,
            "lifeLongResultCount": 20,
            "dailyFortuneResultCount": 30,
            "dreamInterpretationResultCount": 40
        }),
    ))
}

async fn result_index(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let entries = state.index_entries.lock().unwrap().clone();
    Ok(envelope(&state, json!({ "results": entries })))
}

async fn profile_name(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    Ok(envelope(&state, json!("서연")))
}

async fn presign(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let file_name = body["fileName"].as_str().unwrap_or("photo.png");
    let url = format!(
        "http://{}/upload/{}?X-Amz-Signature=stub-sig",
        headers
            .get("host")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("127.0.0.1"),
        file_name
    );
    Ok(envelope(&state, json!({ "url": url })))
}

fn detail_guard(state: &StubState) -> Result<(), StatusCode> {
    if state.fail_details.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(())
}

async fn face_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    detail_guard(&state)?;
    Ok(envelope(
        &state,
        json!({
            "id": id,
            "overallImpression": { "overallImpression": "밝은 인상입니다.", "overallFortune": "대체로 순탄합니다." },
            "eye": { "feature": "눈매가 또렷합니다." },
            "advice": { "keyword": "신뢰", "caution": ["과로 주의"] }
        }),
    ))
}

async fn dream_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    detail_guard(&state)?;
    Ok(envelope(
        &state,
        json!({
            "id": id,
            "summary": "길몽입니다.",
            "symbolInterpretation": { "symbolText": "물은 재물을 상징합니다." }
        }),
    ))
}

async fn daily_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    detail_guard(&state)?;
    Ok(envelope(
        &state,
        json!({
            "id": id,
            "overallSummary": "좋은 기운이 흐르는 날입니다.",
            "overallRating": 4
        }),
    ))
}

async fn life_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    detail_guard(&state)?;
    Ok(envelope(
        &state,
        json!({
            "id": id,
            "personality": { "strength": "성실함" }
        }),
    ))
}

async fn analyze_face(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    assert!(body.get("imageUrl").is_some() && body.get("imageType").is_some());
    Ok(envelope(
        &state,
        json!({
            "id": "face-11",
            "overallImpression": { "overallImpression": "밝은 인상입니다." },
            "advice": { "keyword": "신뢰" }
        }),
    ))
}

async fn compute_dream(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    assert!(body.get("dreamDescription").is_some());
    Ok(envelope(
        &state,
        json!({ "id": "dream-21", "summary": "길몽입니다." }),
    ))
}

async fn compute_daily(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    assert!(body.get("birthDate").is_some() && body.get("zodiacSign").is_some());
    Ok(envelope(
        &state,
        json!({ "id": "daily-31", "overallSummary": "차분한 하루입니다." }),
    ))
}

async fn compute_life(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    assert!(body.get("birthDate").is_some() && body.get("birthTime").is_some());
    Ok(envelope(
        &state,
        json!({ "id": "life-41", "personality": { "strength": "성실함" } }),
    ))
}

async fn upload(
    State(state): State<Arc<StubState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> StatusCode {
    let had_bearer = headers.get("authorization").is_some();
    state
        .uploads
        .lock()
        .unwrap()
        .push((path, body.len(), had_bearer));
    StatusCode::OK
}

// ─── Admin handlers ──────────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct PageParams {
    page: u32,
    size: u32,
}

async fn admin_users(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    assert!(params.size > 0);
    Ok(envelope(
        &state,
        json!({
            "content": [
                {
                    "userId": format!("user-{}", params.page * params.size),
                    "email": "minsu@example.com",
                    "name": "민수",
                    "sex": "M",
                    "role": "USER",
                    "birthInfo": { "birthYear": "1995", "birthMonth": "03", "birthDay": "14" }
                }
            ],
            "totalPages": 3
        }),
    ))
}

async fn admin_user_detail(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let user_id = body["userId"].as_str().unwrap_or_default().to_string();
    Ok(envelope(
        &state,
        json!({
            "userId": user_id,
            "email": "minsu@example.com",
            "name": "민수",
            "remainingLimitCount": 2,
            "isBlackList": false
        }),
    ))
}

async fn admin_delete_user(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let user_id = body["userId"].as_str().unwrap_or_default().to_string();
    state.deleted_users.lock().unwrap().push(user_id);
    Ok(envelope(&state, Value::Null))
}

async fn admin_blacklist(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let user_id = body["userId"].as_str().unwrap_or_default().to_string();
    state.blacklisted_users.lock().unwrap().push(user_id);
    Ok(envelope(&state, Value::Null))
}

async fn admin_expire(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let user_id = body["userId"].as_str().unwrap_or_default().to_string();
    state.expired_users.lock().unwrap().push(user_id);
    Ok(envelope(&state, Value::Null))
}

async fn admin_grant(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(count): Path<u32>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers)?;
    let user_id = body["userId"].as_str().unwrap_or_default().to_string();
    state.granted_free.lock().unwrap().push((user_id, count));
    Ok(envelope(&state, Value::Null))
}
