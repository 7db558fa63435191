//! 사용자 조회 엔드포인트.
//!
//! 인증된 사용자 본인의 프로필 조회를 제공합니다.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiErrorResponse, ApiResult};
use crate::routes::internal_error;
use crate::state::AppState;

/// 사용자 라우터 생성.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

/// 프로필 응답.
///
/// 비밀번호 해시 등 민감 정보는 절대 포함하지 않습니다.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    /// 사용자 ID
    pub id: Uuid,
    /// 사용자 이름
    pub username: String,
    /// 가입 시각
    pub created_at: DateTime<Utc>,
}

/// 내 프로필 조회.
///
/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "프로필 조회 성공", body = ProfileResponse),
        (status = 401, description = "인증 실패", body = ApiErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .store
        .find_by_username(&identity.username)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            // 검증 직후 삭제된 경우에만 도달 가능
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiErrorResponse::simple("UNAUTHENTICATED", "인증에 실패했습니다")),
            )
        })?;

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
    }))
}
