//! 日志与指标
//! 结构化日志初始化，以及认证相关指标的名称和描述

use crate::config::LoggingConfig;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// 登录尝试计数，标签 outcome = success | rejected
pub const LOGIN_ATTEMPTS: &str = "auth_login_attempts_total";
/// 注册计数，标签 outcome = created | duplicate | invalid
pub const REGISTRATIONS: &str = "auth_registrations_total";
/// 被拒绝的受保护请求，标签 reason = unauthenticated | forbidden
pub const ACCESS_DENIED: &str = "auth_access_denied_total";

/// 初始化日志系统
///
/// RUST_LOG 优先于配置中的级别。重复调用返回错误而不是 panic，
/// 测试中多次构建应用时可以直接忽略。
pub fn init_telemetry(
    logging: &LoggingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let log_layer = match logging.format.to_lowercase().as_str() {
        // 生产环境：每个 span 结束时输出一行 JSON
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init()?;

    tracing::info!(
        level = %logging.level,
        format = %logging.format,
        "Telemetry initialized"
    );

    Ok(())
}

/// 注册指标描述
///
/// 没有安装 recorder 时 metrics 宏是空操作，调用顺序无关紧要。
pub fn describe_metrics() {
    metrics::describe_counter!(LOGIN_ATTEMPTS, "Login attempts by outcome");
    metrics::describe_counter!(REGISTRATIONS, "Registration attempts by outcome");
    metrics::describe_counter!(
        ACCESS_DENIED,
        "Requests rejected by the authentication or role layer"
    );
    metrics::describe_counter!("http_requests_total", "HTTP requests by method and status");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
}
