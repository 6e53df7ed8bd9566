//! 存活与就绪探针

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use crate::middleware::AppState;

static APP_START_TIME: OnceLock<Instant> = OnceLock::new();

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<DependencyCheck>,
}

/// 单个依赖的探测结果，不包含底层错误信息
#[derive(Serialize)]
pub struct DependencyCheck {
    pub name: &'static str,
    pub backend: &'static str,
    pub healthy: bool,
    pub latency_ms: u64,
}

/// 记录启动时间，重复调用无效果
pub fn set_start_time() {
    APP_START_TIME.get_or_init(Instant::now);
}

pub fn get_uptime() -> u64 {
    APP_START_TIME
        .get()
        .map_or(0, |start| start.elapsed().as_secs())
}

/// GET /health：进程存活即返回 200，不触碰存储
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: get_uptime(),
    })
}

/// GET /ready：凭据存储不可用时返回 503
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let store = &state.credential_store;

    let start = Instant::now();
    let status = store.health_check().await;

    let checks = vec![DependencyCheck {
        name: "credential_store",
        backend: store.backend(),
        healthy: status.is_healthy(),
        latency_ms: start.elapsed().as_millis() as u64,
    }];

    let ready = checks.iter().all(|c| c.healthy);
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(ReadinessResponse { ready, checks }))
}
