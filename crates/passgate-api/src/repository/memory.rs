//! 인메모리 사용자 저장소.
//!
//! `DATABASE_URL` 없이 서비스를 띄우는 개발 모드와 테스트에서 사용됩니다.
//! 재시작 시 모든 데이터가 사라지므로 운영 환경에서는 Postgres 저장소를 사용하세요.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, UserRecord, UserStore};

/// 인메모리 사용자 저장소.
///
/// epoch 증가는 쓰기 잠금 아래에서 수행되어 동시 검증과 선형화됩니다.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(StoreError::DuplicateUsername);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            revocation_epoch: 0,
            current_refresh_token: None,
            created_at: Utc::now(),
        };
        users.insert(username.to_string(), record.clone());
        Ok(record)
    }

    async fn increment_epoch(&self, username: &str) -> Result<i64, StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or(StoreError::NotFound)?;
        user.revocation_epoch += 1;
        Ok(user.revocation_epoch)
    }

    async fn set_current_refresh_token(
        &self,
        username: &str,
        token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(username).ok_or(StoreError::NotFound)?;
        user.current_refresh_token = token.map(|t| t.to_string());
        Ok(())
    }

    async fn current_refresh_token(&self, username: &str) -> Result<Option<String>, StoreError> {
        let users = self.users.read().await;
        let user = users.get(username).ok_or(StoreError::NotFound)?;
        Ok(user.current_refresh_token.clone())
    }
}
