//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭, 인증 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 반환값
///
/// `/metrics` 엔드포인트에서 메트릭을 렌더링하기 위한 `PrometheusHandle`
///
/// # 패닉
///
/// 레코더가 이미 설치되어 있으면 패닉합니다.
pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        // HTTP 요청 지속 시간 히스토그램 버킷 설정
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("히스토그램 버킷 설정 실패")
        .install_recorder()
        .expect("Prometheus 레코더 설치 실패")
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭 헬퍼 함수
// ============================================================================

/// 토큰 발급 카운터 증가.
pub fn record_token_issued(token_type: &str) {
    counter!("auth_tokens_issued_total", "type" => token_type.to_string()).increment(1);
}

/// 토큰 검증 실패 카운터 증가.
///
/// 응답은 단일 401로 수렴하지만 운영자는 실패 종류별 추이를
/// 볼 수 있어야 합니다.
pub fn record_verify_rejected(reason: &str) {
    counter!("auth_verify_rejected_total", "reason" => reason.to_string()).increment(1);
}

/// 로그인 시도 카운터 증가.
pub fn record_login_attempt(outcome: &str) {
    counter!("auth_login_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

/// 세션 폐기(epoch 증가) 카운터 증가.
pub fn record_revocation() {
    counter!("auth_revocations_total").increment(1);
}

// ============================================================================
// 경로 정규화 유틸리티
// ============================================================================

/// 경로에서 동적 파라미터를 정규화합니다.
///
/// 예: `/users/123e4567-e89b-12d3-a456-426614174000` → `/users/:id`
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let normalized: Vec<String> = segments
        .iter()
        .map(|segment| {
            // UUID 패턴 또는 숫자만 있는 경우 :id로 대체
            let is_uuid = segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4;
            let is_numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());

            if is_uuid || is_numeric {
                ":id".to_string()
            } else {
                (*segment).to_string()
            }
        })
        .collect();
    normalized.join("/")
}
