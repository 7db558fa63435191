//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/auth` - 회원가입/로그인/재발급/로그아웃
//! - `/api/v1/users` - 인증된 사용자 프로필

pub mod auth;
pub mod health;
pub mod users;

pub use auth::{
    auth_router, LoginRequest, LogoutResponse, RefreshRequest, RefreshResponse, SignupRequest,
    SignupResponse,
};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use users::{users_router, ProfileResponse};

use axum::{http::StatusCode, Json, Router};
use std::sync::Arc;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// 전체 API 라우터 생성.
///
/// 모든 서브 라우터를 조합하여 하나의 라우터로 반환합니다.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        // 헬스 체크 엔드포인트
        .nest("/health", health_router())
        // API v1 엔드포인트
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/users", users_router())
}

/// 내부 에러를 500 응답으로 변환.
///
/// 구체적 원인은 로그에만 남기고 클라이언트에는 노출하지 않습니다.
pub(crate) fn internal_error(
    err: impl std::fmt::Display,
) -> (StatusCode, Json<ApiErrorResponse>) {
    tracing::error!(error = %err, "내부 에러");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiErrorResponse::new("INTERNAL", "내부 서버 에러가 발생했습니다")),
    )
}
