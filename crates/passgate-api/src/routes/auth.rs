//! 인증 엔드포인트.
//!
//! 회원가입, 로그인, 토큰 재발급, 로그아웃을 제공합니다.
//!
//! 로그인/재발급 실패는 보안상 세부 원인을 노출하지 않습니다.
//! "사용자 없음"과 "비밀번호 불일치"는 같은 응답입니다.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    hash_password, issue_access_token, issue_token_pair, revoke_sessions,
    validate_password_strength, verify_password, AuthUser, TokenPair, TokenType, VerifyError,
};
use crate::error::{ApiErrorResponse, ApiResult};
use crate::metrics::{
    record_login_attempt, record_revocation, record_token_issued, record_verify_rejected,
};
use crate::repository::StoreError;
use crate::routes::internal_error;
use crate::state::AppState;

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
}

// ==================== DTO ====================

/// 회원가입 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    /// 사용자 이름 (3~64자, 고유)
    #[validate(length(min = 3, max = 64, message = "사용자 이름은 3~64자여야 합니다"))]
    pub username: String,
    /// 비밀번호 (최소 8자, 영문자/숫자 포함)
    pub password: String,
}

/// 회원가입 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    /// 생성된 사용자 ID
    pub id: Uuid,
    /// 사용자 이름
    pub username: String,
}

/// 로그인 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 토큰 재발급 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// 로그인 시 발급받은 refresh token
    pub refresh_token: String,
}

/// 토큰 재발급 응답.
///
/// 회전 모드에서만 `refresh_token`이 포함됩니다. 정적 모드에서는
/// 기존 refresh token을 만료 시까지 계속 사용합니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    /// 새 Access Token
    pub access_token: String,
    /// 새 Refresh Token (회전 모드 전용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access Token 만료 시간 (초)
    pub expires_in: i64,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
}

/// 로그아웃 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

// ==================== 핸들러 ====================

/// 회원가입.
///
/// POST /api/v1/auth/signup
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "사용자 생성됨", body = SignupResponse),
        (status = 409, description = "이미 사용 중인 사용자 이름", body = ApiErrorResponse),
        (status = 422, description = "입력값 검증 실패", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    req.validate().map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiErrorResponse::with_details(
                "VALIDATION_ERROR",
                "입력값이 유효하지 않습니다",
                serde_json::json!(e.to_string()),
            )),
        )
    })?;

    validate_password_strength(&req.password).map_err(|msg| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiErrorResponse::new("VALIDATION_ERROR", msg)),
        )
    })?;

    let password_hash = hash_password(&req.password).map_err(internal_error)?;

    match state.store.create(&req.username, &password_hash).await {
        Ok(user) => {
            info!(username = %user.username, id = %user.id, "사용자 등록 완료");
            Ok((
                StatusCode::CREATED,
                Json(SignupResponse {
                    id: user.id,
                    username: user.username,
                }),
            ))
        }
        Err(StoreError::DuplicateUsername) => {
            warn!(username = %req.username, "이미 존재하는 사용자 이름으로 가입 시도");
            Err((
                StatusCode::CONFLICT,
                Json(ApiErrorResponse::new(
                    "USERNAME_TAKEN",
                    "이미 사용 중인 사용자 이름입니다",
                )),
            ))
        }
        Err(e) => Err(internal_error(e)),
    }
}

/// 로그인.
///
/// 자격증명 확인 후 현재 epoch을 스냅샷한 access/refresh token 쌍을
/// 발급합니다. 회전 모드에서는 발급된 refresh token을 저장소에
/// 기록합니다.
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "로그인 성공", body = TokenPair),
        (status = 401, description = "자격증명 불일치", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let invalid_credentials = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiErrorResponse::new(
                "INVALID_CREDENTIALS",
                "사용자 이름 또는 비밀번호가 올바르지 않습니다",
            )),
        )
    };

    let user = state
        .store
        .find_by_username(&req.username)
        .await
        .map_err(internal_error)?;

    let Some(user) = user else {
        warn!(username = %req.username, "존재하지 않는 사용자로 로그인 시도");
        record_login_attempt("failure");
        return Err(invalid_credentials());
    };

    if verify_password(&req.password, &user.password_hash).is_err() {
        warn!(username = %user.username, "비밀번호 불일치");
        record_login_attempt("failure");
        return Err(invalid_credentials());
    }

    let pair = issue_token_pair(&user.username, user.revocation_epoch, &state.settings)
        .map_err(internal_error)?;

    if state.settings.rotate_refresh_tokens {
        state
            .store
            .set_current_refresh_token(&user.username, Some(&pair.refresh_token))
            .await
            .map_err(internal_error)?;
    }

    record_login_attempt("success");
    record_token_issued("access");
    record_token_issued("refresh");
    info!(username = %user.username, epoch = user.revocation_epoch, "로그인 성공");
    Ok(Json(pair))
}

/// 토큰 재발급.
///
/// refresh token을 검증하고 새 access token을 발급합니다.
/// 실패 원인(만료/위조/폐기/회전 재사용)은 구분하지 않고 하나의
/// 401로 응답합니다.
///
/// POST /api/v1/auth/refresh
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "재발급 성공", body = RefreshResponse),
        (status = 401, description = "유효하지 않거나 만료된 refresh token", body = ApiErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let invalid_refresh = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiErrorResponse::new(
                "INVALID_REFRESH_TOKEN",
                "유효하지 않거나 만료된 refresh token입니다",
            )),
        )
    };

    let identity = state
        .verifier
        .verify(&req.refresh_token, TokenType::Refresh)
        .await
        .map_err(|e| match e {
            VerifyError::Store(err) => internal_error(err),
            other => {
                debug!(reason = %other, "refresh token 거부");
                record_verify_rejected(other.metric_label());
                invalid_refresh()
            }
        })?;

    if state.settings.rotate_refresh_tokens {
        // 회전 모드: 저장된 토큰과 verbatim 비교하여 회전 탈락 토큰의
        // 재사용(replay)을 차단
        let stored = state
            .store
            .current_refresh_token(&identity.username)
            .await
            .map_err(internal_error)?;

        if stored.as_deref() != Some(req.refresh_token.as_str()) {
            warn!(username = %identity.username, "회전 탈락 refresh token 재사용 시도");
            record_verify_rejected("rotated_reuse");
            return Err(invalid_refresh());
        }

        let pair = issue_token_pair(&identity.username, identity.revocation_epoch, &state.settings)
            .map_err(internal_error)?;

        state
            .store
            .set_current_refresh_token(&identity.username, Some(&pair.refresh_token))
            .await
            .map_err(internal_error)?;

        record_token_issued("access");
        record_token_issued("refresh");
        info!(username = %identity.username, "refresh token 회전 완료");
        Ok(Json(RefreshResponse {
            access_token: pair.access_token,
            refresh_token: Some(pair.refresh_token),
            expires_in: pair.expires_in,
            token_type: pair.token_type,
        }))
    } else {
        // 정적 모드: access token만 재발급, refresh token은 재사용
        let access_token =
            issue_access_token(&identity.username, identity.revocation_epoch, &state.settings)
                .map_err(internal_error)?;

        record_token_issued("access");
        Ok(Json(RefreshResponse {
            access_token,
            refresh_token: None,
            expires_in: state.settings.access_ttl.num_seconds(),
            token_type: "Bearer".to_string(),
        }))
    }
}

/// 로그아웃.
///
/// 현재 유효한 access token이 필요합니다. 사용자의 revocation epoch을
/// 증가시켜 해당 사용자의 기존 토큰 전부(access/refresh)를 무효화합니다.
///
/// POST /api/v1/auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "로그아웃 완료", body = LogoutResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<LogoutResponse>> {
    let new_epoch = revoke_sessions(state.store.as_ref(), &identity.username)
        .await
        .map_err(internal_error)?;

    record_revocation();
    info!(username = %identity.username, new_epoch, "세션 전체 폐기");
    Ok(Json(LogoutResponse {
        message: "로그아웃되었습니다".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSettings;
    use crate::repository::MemoryUserStore;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use chrono::Duration;
    use tower::ServiceExt;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn test_app(rotate: bool) -> Router {
        let settings = TokenSettings::new(
            TEST_SECRET,
            Duration::minutes(15),
            Duration::days(7),
            rotate,
        );
        let state = Arc::new(AppState::new(Arc::new(MemoryUserStore::new()), settings));
        Router::new()
            .nest("/api/v1/auth", auth_router())
            .with_state(state)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_signup_then_duplicate() {
        let app = test_app(false);

        let body = serde_json::json!({"username": "alice", "password": "password1"});
        let response = app
            .clone()
            .oneshot(json_request("/api/v1/auth/signup", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["username"], "alice");

        // 같은 이름으로 재가입은 409
        let response = app
            .oneshot(json_request("/api/v1/auth/signup", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn test_signup_weak_password_rejected() {
        let app = test_app(false);

        let body = serde_json::json!({"username": "alice", "password": "short"});
        let response = app
            .oneshot(json_request("/api/v1/auth/signup", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_login_unknown_user_and_wrong_password_same_response() {
        let app = test_app(false);

        let signup = serde_json::json!({"username": "alice", "password": "password1"});
        app.clone()
            .oneshot(json_request("/api/v1/auth/signup", signup))
            .await
            .unwrap();

        // 존재하지 않는 사용자
        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/login",
                serde_json::json!({"username": "ghost", "password": "password1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let unknown = body_json(response).await;

        // 잘못된 비밀번호
        let response = app
            .oneshot(json_request(
                "/api/v1/auth/login",
                serde_json::json!({"username": "alice", "password": "wrongpass1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let wrong = body_json(response).await;

        // 두 실패는 구분 불가능해야 함
        assert_eq!(unknown["code"], wrong["code"]);
        assert_eq!(unknown["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let app = test_app(false);

        app.clone()
            .oneshot(json_request(
                "/api/v1/auth/signup",
                serde_json::json!({"username": "alice", "password": "password1"}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/login",
                serde_json::json!({"username": "alice", "password": "password1"}),
            ))
            .await
            .unwrap();
        let tokens = body_json(response).await;

        // access token을 refresh 엔드포인트에 제출 → 거부
        let response = app
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refresh_token": tokens["access_token"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_REFRESH_TOKEN");
    }

    #[tokio::test]
    async fn test_static_mode_refresh_reuses_token() {
        let app = test_app(false);

        app.clone()
            .oneshot(json_request(
                "/api/v1/auth/signup",
                serde_json::json!({"username": "alice", "password": "password1"}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/login",
                serde_json::json!({"username": "alice", "password": "password1"}),
            ))
            .await
            .unwrap();
        let tokens = body_json(response).await;
        let refresh_token = tokens["refresh_token"].clone();

        // 첫 번째 재발급
        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refresh_token": refresh_token}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["access_token"].is_string());
        // 정적 모드에서는 새 refresh token이 없음
        assert!(json.get("refresh_token").is_none());

        // 같은 refresh token으로 재발급 반복 가능
        let response = app
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refresh_token": refresh_token}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rotating_mode_replay_rejected() {
        let app = test_app(true);

        app.clone()
            .oneshot(json_request(
                "/api/v1/auth/signup",
                serde_json::json!({"username": "alice", "password": "password1"}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/login",
                serde_json::json!({"username": "alice", "password": "password1"}),
            ))
            .await
            .unwrap();
        let tokens = body_json(response).await;
        let refresh_a = tokens["refresh_token"].clone();

        // refresh A → access2 + refresh B
        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refresh_token": refresh_a}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let refresh_b = json["refresh_token"].clone();
        assert!(refresh_b.is_string());
        assert_ne!(refresh_a, refresh_b);

        // 회전 탈락한 refresh A 재사용 → 거부
        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refresh_token": refresh_a}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // 새 refresh B는 유효
        let response = app
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refresh_token": refresh_b}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
