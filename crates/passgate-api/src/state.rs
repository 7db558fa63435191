//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.
//! 요청 간 공유되는 가변 상태는 사용자 저장소뿐입니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::{TokenSettings, TokenVerifier};
use crate::repository::UserStore;

/// 애플리케이션 공유 상태.
///
/// Axum의 State extractor를 통해 핸들러에 주입됩니다.
#[derive(Clone)]
pub struct AppState {
    /// 사용자 저장소 (Postgres 또는 인메모리)
    pub store: Arc<dyn UserStore>,
    /// 토큰 검증기
    pub verifier: TokenVerifier,
    /// 토큰 발급 설정
    pub settings: TokenSettings,
    /// DB 커넥션 풀 (인메모리 모드에서는 None)
    pub db_pool: Option<PgPool>,
    /// 서버 시작 시각 (업타임 계산용)
    pub started_at: DateTime<Utc>,
    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새 애플리케이션 상태를 생성합니다.
    pub fn new(store: Arc<dyn UserStore>, settings: TokenSettings) -> Self {
        let verifier = TokenVerifier::new(Arc::clone(&store), settings.clone());
        Self {
            store,
            verifier,
            settings,
            db_pool: None,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// DB 커넥션 풀을 연결합니다 (헬스 체크용).
    #[must_use]
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// 데이터베이스 연결 상태 확인.
    pub async fn is_db_healthy(&self) -> bool {
        match &self.db_pool {
            Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
            None => false,
        }
    }

    /// 서버 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
