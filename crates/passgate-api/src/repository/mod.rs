//! 사용자 저장소 (Credential Store).
//!
//! 데이터베이스 접근 로직을 라우트 핸들러에서 분리하여 관리합니다.
//! 토큰 검증이 필요로 하는 저장소 연산은 [`UserStore`] trait으로 좁게 정의되며,
//! 운영 환경에서는 Postgres 구현을, 개발/테스트 환경에서는 인메모리 구현을 사용합니다.

pub mod memory;
pub mod users;

pub use memory::MemoryUserStore;
pub use users::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 이미 존재하는 사용자 이름
    #[error("이미 존재하는 사용자 이름입니다")]
    DuplicateUsername,

    /// 사용자를 찾을 수 없음
    #[error("사용자를 찾을 수 없습니다")]
    NotFound,

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

/// 사용자 레코드.
///
/// `revocation_epoch`는 로그아웃 시마다 1씩 증가하는 단조 증가 카운터입니다.
/// 토큰은 발급 시점의 값을 스냅샷으로 담고, 저장된 값과 다르면 무효 처리됩니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub revocation_epoch: i64,
    /// 회전 모드에서 현재 유효한 refresh token (verbatim 비교용)
    pub current_refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 토큰 수명주기가 소비하는 좁은 저장소 인터페이스.
///
/// 같은 사용자에 대한 epoch 증가는 동시 검증과 선형화 가능해야 합니다.
/// 검증은 증가 전 값 또는 증가 후 값만 관찰할 수 있습니다.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 사용자 이름으로 조회.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// 새 사용자 생성. epoch은 0으로 시작합니다.
    async fn create(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    /// revocation epoch을 원자적으로 1 증가시키고 새 값을 반환합니다.
    ///
    /// 동시 호출이 증가를 잃어버리면 안 됩니다 (read-modify-write 금지).
    async fn increment_epoch(&self, username: &str) -> Result<i64, StoreError>;

    /// 현재 유효한 refresh token을 저장합니다 (회전 모드 전용).
    async fn set_current_refresh_token(
        &self,
        username: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError>;

    /// 현재 유효한 refresh token을 조회합니다 (회전 모드 전용).
    async fn current_refresh_token(&self, username: &str) -> Result<Option<String>, StoreError>;
}
