//! Postgres 사용자 저장소.
//!
//! `users` 테이블에 대한 [`UserStore`] 구현.
//! epoch 증가는 단일 행 `UPDATE ... SET revocation_epoch = revocation_epoch + 1`로
//! 처리되어 데이터베이스가 선형화를 보장합니다.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, UserRecord, UserStore};

/// Postgres 기반 사용자 저장소.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// 커넥션 풀로 저장소를 생성합니다.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// sqlx 에러를 저장소 에러로 변환.
///
/// unique 제약 위반은 사용자 이름 중복으로 매핑합니다.
fn map_db_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateUsername;
        }
    }
    StoreError::Database(err.to_string())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, password_hash, revocation_epoch, current_refresh_token, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, password_hash, revocation_epoch)
            VALUES ($1, $2, $3, 0)
            RETURNING id, username, password_hash, revocation_epoch, current_refresh_token, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn increment_epoch(&self, username: &str) -> Result<i64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET revocation_epoch = revocation_epoch + 1
            WHERE username = $1
            RETURNING revocation_epoch
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(|(epoch,)| epoch).ok_or(StoreError::NotFound)
    }

    async fn set_current_refresh_token(
        &self,
        username: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_refresh_token = $2
            WHERE username = $1
            "#,
        )
        .bind(username)
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn current_refresh_token(&self, username: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT current_refresh_token
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(|(token,)| token).ok_or(StoreError::NotFound)
    }
}
