//! # Passgate Core
//!
//! 인증 서비스의 기반 인프라를 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 구성 요소를 제공합니다:
//! - 설정 관리 (서버, 데이터베이스, 토큰 정책)
//! - 로깅 인프라

pub mod config;
pub mod logging;

pub use config::*;
pub use logging::*;
