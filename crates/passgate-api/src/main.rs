//! 인증 API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 회원가입, 로그인, 토큰 재발급, 로그아웃 엔드포인트를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use passgate_api::auth::TokenSettings;
use passgate_api::metrics::setup_metrics_recorder;
use passgate_api::middleware::metrics_layer;
use passgate_api::openapi::swagger_ui_router;
use passgate_api::repository::{MemoryUserStore, PgUserStore, UserStore};
use passgate_api::routes::create_api_router;
use passgate_api::state::AppState;
use passgate_core::{init_logging, AppConfig, LogConfig};

/// 사용자 저장소 초기화.
///
/// `database.url`이 설정되어 있으면 Postgres 저장소를 사용하고,
/// 없으면 인메모리 저장소로 동작합니다 (개발/테스트 전용 -
/// 재시작 시 모든 사용자가 사라집니다).
async fn create_user_store(
    config: &AppConfig,
) -> Result<(Arc<dyn UserStore>, Option<sqlx::PgPool>), Box<dyn std::error::Error>> {
    match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
                .connect(url)
                .await?;

            // 연결 확인
            sqlx::query("SELECT 1").execute(&pool).await?;
            info!("Postgres 사용자 저장소 연결 완료");

            Ok((Arc::new(PgUserStore::new(pool.clone())), Some(pool)))
        }
        None => {
            warn!("database.url 미설정 - 인메모리 저장소로 동작합니다 (개발 전용)");
            Ok((Arc::new(MemoryUserStore::new()), None))
        }
    }
}

/// CORS 미들웨어 구성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    // 메트릭 라우터 (별도 상태)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router().with_state(state))
        // OpenAPI 문서 및 Swagger UI
        .merge(swagger_ui_router())
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // 설정 로드 (파일 + PASSGATE__ 환경변수)
    let config = AppConfig::load_default()?;

    // tracing 초기화
    init_logging(LogConfig::from(&config.logging))?;

    info!("Starting Passgate API server...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                "소켓 주소 설정이 유효하지 않습니다. server.host, server.port 설정을 확인하세요."
            );
            e
        })?;

    // 사용자 저장소 초기화 (Postgres 또는 인메모리)
    let (store, db_pool) = create_user_store(&config).await?;

    // AppState 생성
    let settings = TokenSettings::from_config(&config.tokens);
    let mut state = AppState::new(store, settings);
    if let Some(pool) = db_pool {
        state = state.with_db_pool(pool);
    }
    let state = Arc::new(state);

    info!(
        version = %state.version,
        has_db = state.db_pool.is_some(),
        rotate_refresh = state.settings.rotate_refresh_tokens,
        "Application state initialized"
    );

    // 라우터 생성
    let app = create_router(state, metrics_handle);

    // 서버 시작
    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown 처리
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료를 시작합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
