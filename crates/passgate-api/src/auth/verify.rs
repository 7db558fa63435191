//! 토큰 검증 및 세션 폐기.
//!
//! 검증은 토큰 자체의 서명/만료/종류 확인에 더해, 사용자의 현재
//! revocation epoch과 토큰에 스냅샷된 epoch을 비교합니다. 로그아웃은
//! epoch을 1 증가시키는 것만으로 해당 사용자의 기존 토큰 전부를
//! 무효화합니다. 토큰 블랙리스트는 없습니다.

use std::sync::Arc;

use tracing::debug;

use super::jwt::{decode_token, JwtError, TokenSettings, TokenType};
use crate::repository::{StoreError, UserStore};

/// 검증에 성공한 요청의 인증된 신원.
#[derive(Debug, Clone)]
pub struct Identity {
    /// 사용자 이름
    pub username: String,
    /// 검증 시점에 확인된 revocation epoch
    pub revocation_epoch: i64,
}

/// 토큰 검증 실패.
///
/// 실패 종류는 로깅/관측을 위해 구분되지만, API 경계에서는 모두
/// 동일한 "unauthenticated" 응답으로 수렴합니다 (정보 누출 방지).
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// 서명 또는 구조가 유효하지 않은 토큰
    #[error("유효하지 않은 토큰")]
    InvalidToken,
    /// 만료된 토큰
    #[error("만료된 토큰")]
    Expired,
    /// 요구되는 종류와 다른 토큰 (access ↔ refresh 혼용)
    #[error("토큰 종류가 일치하지 않습니다")]
    WrongType,
    /// subject에 해당하는 사용자가 없음
    #[error("사용자를 찾을 수 없습니다")]
    UserNotFound,
    /// epoch 불일치 - 로그아웃 이전에 발급된 토큰
    #[error("폐기되었거나 오래된 토큰")]
    RevokedOrStale,
    /// 저장소 장애 (검증 실패가 아닌 내부 에러)
    #[error("저장소 에러: {0}")]
    Store(#[from] StoreError),
}

impl VerifyError {
    /// 메트릭 라벨용 고정 문자열.
    pub fn metric_label(&self) -> &'static str {
        match self {
            VerifyError::InvalidToken => "invalid",
            VerifyError::Expired => "expired",
            VerifyError::WrongType => "wrong_type",
            VerifyError::UserNotFound => "user_not_found",
            VerifyError::RevokedOrStale => "revoked",
            VerifyError::Store(_) => "store_error",
        }
    }
}

/// 토큰 검증기.
///
/// 토큰 값 자체는 불변이므로 잠금이 필요 없고, 사용자 행의 epoch
/// 한 번 읽기 외에는 상태가 없습니다.
#[derive(Clone)]
pub struct TokenVerifier {
    store: Arc<dyn UserStore>,
    settings: TokenSettings,
}

impl TokenVerifier {
    /// 저장소와 토큰 설정으로 검증기를 생성합니다.
    pub fn new(store: Arc<dyn UserStore>, settings: TokenSettings) -> Self {
        Self { store, settings }
    }

    /// 토큰 검증.
    ///
    /// 검증 순서는 고정입니다:
    ///
    /// 1. 코덱 디코딩 - 서명/구조 실패는 `InvalidToken`, 만료는 `Expired`
    /// 2. `type` 클레임이 `required_type`과 다르면 `WrongType`
    /// 3. subject 사용자 조회 - 없으면 `UserNotFound`
    /// 4. epoch 스냅샷과 저장된 epoch 비교 - 다르면 `RevokedOrStale`
    pub async fn verify(
        &self,
        token: &str,
        required_type: TokenType,
    ) -> Result<Identity, VerifyError> {
        let claims = decode_token(token, &self.settings).map_err(|e| match e {
            JwtError::Expired => VerifyError::Expired,
            _ => VerifyError::InvalidToken,
        })?;

        if claims.token_type != required_type {
            debug!(
                expected = %required_type,
                got = %claims.token_type,
                "토큰 종류 불일치"
            );
            return Err(VerifyError::WrongType);
        }

        let user = self
            .store
            .find_by_username(&claims.sub)
            .await?
            .ok_or(VerifyError::UserNotFound)?;

        if claims.revocation_epoch != user.revocation_epoch {
            debug!(
                username = %claims.sub,
                token_epoch = claims.revocation_epoch,
                current_epoch = user.revocation_epoch,
                "epoch 불일치 - 폐기된 토큰"
            );
            return Err(VerifyError::RevokedOrStale);
        }

        Ok(Identity {
            username: claims.sub,
            revocation_epoch: user.revocation_epoch,
        })
    }
}

/// 사용자의 모든 세션을 폐기합니다 (Revocation Controller).
///
/// 저장소의 원자적 증가 연산으로 epoch을 1 올리고 새 epoch을
/// 반환합니다. 회전 모드에서 저장 중이던 refresh token도 함께
/// 제거합니다. 동시 호출이 증가를 잃지 않는 것은 저장소 계층의
/// 보장입니다.
pub async fn revoke_sessions(store: &dyn UserStore, username: &str) -> Result<i64, StoreError> {
    let new_epoch = store.increment_epoch(username).await?;
    store.set_current_refresh_token(username, None).await?;
    Ok(new_epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{issue_access_token, issue_refresh_token};
    use crate::repository::MemoryUserStore;
    use chrono::Duration;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

    fn settings() -> TokenSettings {
        TokenSettings::new(
            TEST_SECRET,
            Duration::minutes(15),
            Duration::days(7),
            false,
        )
    }

    async fn verifier_with_user(username: &str) -> (TokenVerifier, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        store.create(username, "hash").await.unwrap();
        let verifier = TokenVerifier::new(store.clone(), settings());
        (verifier, store)
    }

    #[tokio::test]
    async fn test_valid_access_token_verifies() {
        let (verifier, _store) = verifier_with_user("alice").await;

        let token = issue_access_token("alice", 0, &settings()).unwrap();
        let identity = verifier.verify(&token, TokenType::Access).await.unwrap();

        assert_eq!(identity.username, "alice");
        assert_eq!(identity.revocation_epoch, 0);
    }

    #[tokio::test]
    async fn test_type_confusion_rejected_both_ways() {
        let (verifier, _store) = verifier_with_user("alice").await;

        let access = issue_access_token("alice", 0, &settings()).unwrap();
        let refresh = issue_refresh_token("alice", 0, &settings()).unwrap();

        assert!(matches!(
            verifier.verify(&access, TokenType::Refresh).await,
            Err(VerifyError::WrongType)
        ));
        assert!(matches!(
            verifier.verify(&refresh, TokenType::Access).await,
            Err(VerifyError::WrongType)
        ));
    }

    #[tokio::test]
    async fn test_revocation_invalidates_old_tokens() {
        let (verifier, store) = verifier_with_user("alice").await;

        let old_token = issue_access_token("alice", 0, &settings()).unwrap();
        assert!(verifier.verify(&old_token, TokenType::Access).await.is_ok());

        let new_epoch = revoke_sessions(store.as_ref(), "alice").await.unwrap();
        assert_eq!(new_epoch, 1);

        // 이전 epoch으로 발급된 토큰은 폐기됨
        assert!(matches!(
            verifier.verify(&old_token, TokenType::Access).await,
            Err(VerifyError::RevokedOrStale)
        ));

        // 새 epoch으로 발급된 토큰은 유효
        let new_token = issue_access_token("alice", new_epoch, &settings()).unwrap();
        assert!(verifier.verify(&new_token, TokenType::Access).await.is_ok());
    }

    #[tokio::test]
    async fn test_double_revoke_is_not_idempotent() {
        let (verifier, store) = verifier_with_user("alice").await;

        let token_a = issue_access_token("alice", 0, &settings()).unwrap();
        assert_eq!(revoke_sessions(store.as_ref(), "alice").await.unwrap(), 1);

        let token_b = issue_access_token("alice", 1, &settings()).unwrap();
        assert_eq!(revoke_sessions(store.as_ref(), "alice").await.unwrap(), 2);

        // 두 번의 폐기 사이에 발급된 토큰까지 모두 무효
        assert!(matches!(
            verifier.verify(&token_a, TokenType::Access).await,
            Err(VerifyError::RevokedOrStale)
        ));
        assert!(matches!(
            verifier.verify(&token_b, TokenType::Access).await,
            Err(VerifyError::RevokedOrStale)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_also_epoch_checked() {
        let (verifier, store) = verifier_with_user("alice").await;

        let refresh = issue_refresh_token("alice", 0, &settings()).unwrap();
        assert!(verifier.verify(&refresh, TokenType::Refresh).await.is_ok());

        revoke_sessions(store.as_ref(), "alice").await.unwrap();
        assert!(matches!(
            verifier.verify(&refresh, TokenType::Refresh).await,
            Err(VerifyError::RevokedOrStale)
        ));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let store = Arc::new(MemoryUserStore::new());
        let verifier = TokenVerifier::new(store, settings());

        let token = issue_access_token("ghost", 0, &settings()).unwrap();
        assert!(matches!(
            verifier.verify(&token, TokenType::Access).await,
            Err(VerifyError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_and_forged_distinct() {
        let (verifier, _store) = verifier_with_user("alice").await;

        let expired_settings = TokenSettings::new(
            TEST_SECRET,
            Duration::minutes(-5),
            Duration::days(7),
            false,
        );
        let expired = issue_access_token("alice", 0, &expired_settings).unwrap();
        assert!(matches!(
            verifier.verify(&expired, TokenType::Access).await,
            Err(VerifyError::Expired)
        ));

        let forged_settings = TokenSettings::new(
            "another-secret-key-for-testing-minimum-32-chars!",
            Duration::minutes(15),
            Duration::days(7),
            false,
        );
        let forged = issue_access_token("alice", 0, &forged_settings).unwrap();
        assert!(matches!(
            verifier.verify(&forged, TokenType::Access).await,
            Err(VerifyError::InvalidToken)
        ));
    }
}
