//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! # 자동 생성 구조
//!
//! 각 라우트 모듈은 자체 스키마를 정의하고, 중앙 `ApiDoc`에서 자동으로 집계합니다.
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

// ==================== 각 모듈에서 스키마 Import ====================

use crate::auth::TokenPair;
use crate::error::ApiErrorResponse;
use crate::routes::{
    ComponentHealth, ComponentStatus, HealthResponse, LoginRequest, LogoutResponse,
    ProfileResponse, RefreshRequest, RefreshResponse, SignupRequest, SignupResponse,
};

// ==================== OpenAPI 문서 정의 ====================

/// Passgate API 문서.
///
/// 모든 엔드포인트와 스키마를 포함하는 OpenAPI 3.0 스펙입니다.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Passgate Auth API",
        version = "0.1.0",
        description = r#"
# Passgate 인증 서비스 REST API

서명된 bearer token 기반 인증 API입니다.

## 주요 기능

- **회원가입/로그인**: Argon2id 해싱 기반 자격증명 관리
- **토큰 발급**: access/refresh token 쌍 (JWT, HS256)
- **토큰 재발급**: refresh token으로 access token 갱신 (정적/회전 모드)
- **로그아웃**: revocation epoch 증가로 전체 세션 즉시 무효화

## 인증

보호된 엔드포인트는 `Authorization: Bearer <access_token>` 헤더가
필요합니다. 검증 실패는 종류와 무관하게 401 하나로 응답합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "Passgate Team")
    ),
    servers(
        (url = "http://localhost:3000", description = "로컬 개발 서버"),
    ),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 가입/로그인/재발급/로그아웃"),
        (name = "users", description = "사용자 - 인증된 사용자 프로필")
    ),
    modifiers(&SecurityAddon),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Common =====
            ApiErrorResponse,

            // ===== Auth =====
            SignupRequest,
            SignupResponse,
            LoginRequest,
            TokenPair,
            RefreshRequest,
            RefreshResponse,
            LogoutResponse,

            // ===== Users =====
            ProfileResponse,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        // ===== Auth =====
        crate::routes::auth::signup,
        crate::routes::auth::login,
        crate::routes::auth::refresh,
        crate::routes::auth::logout,

        // ===== Users =====
        crate::routes::users::me,
    )
)]
pub struct ApiDoc;

/// Bearer 인증 스키마 등록.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// ==================== Swagger UI 라우터 ====================

/// Swagger UI 라우터 생성.
///
/// 다음 경로에 문서 UI를 마운트합니다:
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `/api-docs/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}

// ==================== 테스트 ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_valid() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&spec).unwrap();

        // 기본 정보 확인
        assert!(json.contains("Passgate Auth API"));

        // 태그 확인
        assert!(json.contains("health"));
        assert!(json.contains("auth"));
        assert!(json.contains("users"));

        // 경로 확인
        assert!(json.contains("/api/v1/auth/signup"));
        assert!(json.contains("/api/v1/auth/login"));
        assert!(json.contains("/api/v1/auth/refresh"));
        assert!(json.contains("/api/v1/auth/logout"));
        assert!(json.contains("/api/v1/users/me"));
    }

    #[test]
    fn test_swagger_ui_router_creates() {
        let _router: Router<()> = swagger_ui_router();
    }

    #[test]
    fn test_openapi_contains_security_scheme() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();

        assert!(json.contains("bearer_auth"));
        assert!(json.contains("TokenPair"));
        assert!(json.contains("ApiErrorResponse"));
    }
}
