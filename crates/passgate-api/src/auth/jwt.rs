//! JWT 토큰 코덱 및 발급.
//!
//! Access Token 및 Refresh Token 생성/검증 로직.
//! 토큰은 HS256으로 서명된 compact JWT (base64url 세그먼트 3개)이며,
//! 발급 시점의 revocation epoch을 클레임으로 스냅샷합니다.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use passgate_core::config::TokenConfig;

/// 토큰 종류.
///
/// Access와 Refresh는 절대 호환되지 않습니다. 모든 검증 경로에서
/// `type` 클레임을 확인합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// API 호출에 사용되는 단명 토큰
    Access,
    /// Access Token 재발급에만 사용되는 장명 토큰
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT 페이로드.
///
/// 클레임 키는 와이어 호환성의 일부입니다:
/// `sub`, `type`, `iat`, `exp`, `revocation_epoch`, `jti`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - 사용자 이름
    pub sub: String,
    /// 토큰 종류 (access | refresh)
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
    /// 발급 시점 사용자의 revocation epoch 스냅샷
    pub revocation_epoch: i64,
    /// JWT ID - 토큰 고유 식별자
    pub jti: String,
}

impl Claims {
    /// 새로운 Claims 생성.
    ///
    /// # Arguments
    ///
    /// * `username` - 사용자 이름 (subject)
    /// * `token_type` - 토큰 종류
    /// * `revocation_epoch` - 발급 시점의 epoch 스냅샷
    /// * `ttl` - 유효 기간
    pub fn new(
        username: impl Into<String>,
        token_type: TokenType,
        revocation_epoch: i64,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: username.into(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            revocation_epoch,
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// 토큰 발급/검증 설정.
///
/// 시크릿 강도 검증은 설정 로드 시점에 끝나 있습니다
/// ([`TokenConfig::validate`]).
#[derive(Clone)]
pub struct TokenSettings {
    /// HMAC 서명 시크릿
    secret: SecretString,
    /// Access Token 유효 기간
    pub access_ttl: Duration,
    /// Refresh Token 유효 기간
    pub refresh_ttl: Duration,
    /// Refresh Token 회전 모드
    pub rotate_refresh_tokens: bool,
}

impl TokenSettings {
    /// 설정에서 토큰 설정을 생성합니다.
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
            rotate_refresh_tokens: config.rotate_refresh_tokens,
        }
    }

    /// 명시적 값으로 설정을 생성합니다 (주로 테스트용).
    pub fn new(
        secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        rotate_refresh_tokens: bool,
    ) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            access_ttl,
            refresh_ttl,
            rotate_refresh_tokens,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .finish()
    }
}

/// Access Token + Refresh Token 페어.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    /// Access Token
    pub access_token: String,
    /// Refresh Token
    pub refresh_token: String,
    /// Access Token 만료 시간 (초)
    pub expires_in: i64,
    /// 토큰 타입 (항상 "Bearer")
    pub token_type: String,
}

/// 토큰 코덱 에러.
///
/// 만료는 위조/변조와 구분되는 별도 실패 종류입니다.
/// API 경계에서는 모두 동일한 401로 수렴합니다.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// 구조적으로 유효하지 않은 토큰
    #[error("잘못된 토큰 형식")]
    Malformed,
    /// 서명 검증 실패 (위조/변조)
    #[error("토큰 서명이 유효하지 않습니다")]
    SignatureInvalid,
    /// 만료된 토큰
    #[error("토큰이 만료되었습니다")]
    Expired,
    /// 토큰 인코딩 실패
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

/// Access Token 발급.
///
/// 만료 시간은 `now + access_ttl`이며, 사용자의 현재 epoch을 스냅샷합니다.
pub fn issue_access_token(
    username: &str,
    revocation_epoch: i64,
    settings: &TokenSettings,
) -> Result<String, JwtError> {
    let claims = Claims::new(
        username,
        TokenType::Access,
        revocation_epoch,
        settings.access_ttl,
    );
    encode_claims(&claims, settings)
}

/// Refresh Token 발급.
pub fn issue_refresh_token(
    username: &str,
    revocation_epoch: i64,
    settings: &TokenSettings,
) -> Result<String, JwtError> {
    let claims = Claims::new(
        username,
        TokenType::Refresh,
        revocation_epoch,
        settings.refresh_ttl,
    );
    encode_claims(&claims, settings)
}

/// Access Token + Refresh Token 쌍 발급.
pub fn issue_token_pair(
    username: &str,
    revocation_epoch: i64,
    settings: &TokenSettings,
) -> Result<TokenPair, JwtError> {
    let access_token = issue_access_token(username, revocation_epoch, settings)?;
    let refresh_token = issue_refresh_token(username, revocation_epoch, settings)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        expires_in: settings.access_ttl.num_seconds(),
        token_type: "Bearer".to_string(),
    })
}

fn encode_claims(claims: &Claims, settings: &TokenSettings) -> Result<String, JwtError> {
    encode(&Header::default(), claims, &settings.encoding_key()).map_err(JwtError::Encoding)
}

/// JWT 토큰 디코딩 및 검증.
///
/// 서명 검증이 통과하기 전에는 어떤 클레임도 신뢰하지 않습니다.
/// 만료 검증은 leeway 없이 수행됩니다 (`now >= exp`는 만료).
pub fn decode_token(token: &str, settings: &TokenSettings) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(token, &settings.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::SignatureInvalid,
            _ => JwtError::Malformed,
        })
}
