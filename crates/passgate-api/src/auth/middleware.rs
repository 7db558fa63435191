//! Axum용 인증 게이트.
//!
//! 보호된 핸들러에서 사용할 인증 추출기. 공개 라우트는 이 추출기를
//! 사용하지 않는 것으로 분류됩니다 (라우트 구성이 곧 정책).

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use super::jwt::TokenType;
use super::verify::{Identity, VerifyError};
use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// 인증 추출기.
///
/// `Authorization: Bearer <token>` 헤더의 access token을 검증하고
/// 인증된 신원을 핸들러에 주입합니다. refresh token 경로는 절대
/// 이 추출기를 거치지 않습니다.
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn protected_handler(
///     AuthUser(identity): AuthUser,
/// ) -> impl IntoResponse {
///     format!("Authenticated user: {}", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

/// 인증 게이트 에러.
///
/// 검증 실패의 구체적 종류는 debug 로그로만 남고, 응답은 항상
/// 동일한 401입니다.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("인증에 실패했습니다")]
    Unauthenticated,
    #[error("내부 에러")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        let body = Json(ApiErrorResponse::simple(code, self.to_string()));
        (status, body).into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                debug!("Authorization 헤더 없음");
                AuthError::Unauthenticated
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            debug!("Bearer 형식이 아닌 Authorization 헤더");
            AuthError::Unauthenticated
        })?;

        match state.verifier.verify(token, TokenType::Access).await {
            Ok(identity) => Ok(AuthUser(identity)),
            Err(VerifyError::Store(e)) => {
                error!(error = %e, "토큰 검증 중 저장소 장애");
                Err(AuthError::Internal)
            }
            Err(e) => {
                // 실패 종류는 로그/메트릭으로만 구분, 응답은 단일 401
                debug!(reason = %e, "access token 거부");
                crate::metrics::record_verify_rejected(e.metric_label());
                Err(AuthError::Unauthenticated)
            }
        }
    }
}
