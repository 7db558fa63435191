//! Bearer token 인증 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - JWT 발급/검증 (access + refresh)
//! - Revocation epoch 기반 서버 주도 세션 무효화
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 토큰 발급/검증, 비밀번호 해싱, 인증 추출기
//! - [`repository`]: 사용자 저장소 (Postgres / 인메모리)
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;

pub use auth::{
    hash_password, revoke_sessions, verify_password, AuthUser, Claims, Identity, TokenPair,
    TokenSettings, TokenType, TokenVerifier, VerifyError,
};
pub use error::{ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use repository::{MemoryUserStore, PgUserStore, StoreError, UserRecord, UserStore};
pub use routes::*;
pub use state::AppState;
