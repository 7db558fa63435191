//! 인증 및 토큰 수명주기.
//!
//! 서명된 자기완결(self-contained) bearer token 기반 인증을 제공합니다.
//! 서버 주도 세션 무효화는 사용자별 revocation epoch 카운터로 처리하며
//! 토큰 블랙리스트는 사용하지 않습니다.
//!
//! # 구성 요소
//!
//! - [`Claims`] / [`TokenType`]: JWT 페이로드 구조체와 토큰 종류
//! - 토큰 발급 함수 ([`issue_access_token`], [`issue_refresh_token`], [`issue_token_pair`])
//! - [`TokenVerifier`]: 서명 → 만료 → 종류 → epoch 순서의 검증기
//! - [`revoke_sessions`]: epoch 증가로 모든 기존 토큰 무효화
//! - [`AuthUser`]: Axum 핸들러용 인증 추출기
//! - 비밀번호 해싱/검증 ([`hash_password`], [`verify_password`])
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn protected_handler(
//!     AuthUser(identity): AuthUser,
//! ) -> impl IntoResponse {
//!     format!("Hello, {}!", identity.username)
//! }
//! ```

mod jwt;
mod middleware;
mod password;
mod verify;

pub use jwt::{
    decode_token, issue_access_token, issue_refresh_token, issue_token_pair, Claims, JwtError,
    TokenPair, TokenSettings, TokenType,
};
pub use middleware::{AuthError, AuthUser};
pub use password::{hash_password, validate_password_strength, verify_password, PasswordError};
pub use verify::{revoke_sessions, Identity, TokenVerifier, VerifyError};
