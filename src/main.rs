//! 认证网关主入口

use auth_gateway::{
    config::AppConfig,
    db,
    handlers::health,
    middleware::AppState,
    repository::{
        CredentialStore, EventStore, MemoryCredentialStore, MemoryEventStore, PgCredentialStore,
        PgEventStore,
    },
    routes, telemetry,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("auth-gateway {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 按优先级加载：.env.local > .env
    // 生产环境应该直接设置环境变量，不依赖 .env 文件
    if let Ok(path) = std::env::var("GATEWAY_ENV") {
        dotenv::from_filename(format!(".env.{}", path)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::dotenv().ok();
    }

    // 设置应用启动时间
    health::set_start_time();

    // 1. 加载配置（缺少签名密钥时直接失败）
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志
    telemetry::init_telemetry(&config.logging)?;
    telemetry::describe_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Auth gateway starting...");

    // 3. 存储：配置了数据库则使用连接池 + 迁移，否则使用内存存储
    let (db_pool, credential_store, event_store) = build_stores(&config).await?;

    // 4. 构建应用状态
    let app_state = Arc::new(AppState::new(config.clone(), credential_store, event_store)?);

    // 5. 初始化管理员账户
    let outcome = app_state
        .auth_service
        .bootstrap_privileged_account(&config.bootstrap)
        .await?;
    tracing::info!(?outcome, "Admin bootstrap finished");

    // 6. 构建路由
    let app = routes::create_router(app_state);

    // 7. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        "Server listening"
    );

    // 8. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = db_pool {
        let timeout = std::time::Duration::from_secs(config.server.graceful_shutdown_timeout_secs);
        if tokio::time::timeout(timeout, db::close_pool(&pool)).await.is_err() {
            tracing::warn!("Graceful shutdown timeout reached while closing database pool");
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 构建凭据存储与活动存储
async fn build_stores(
    config: &AppConfig,
) -> anyhow::Result<(Option<PgPool>, Arc<dyn CredentialStore>, Arc<dyn EventStore>)> {
    if config.database.url.is_none() {
        tracing::warn!("database.url not set, using in-memory stores; data is lost on exit");
        let credential_store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
        let event_store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
        return Ok((None, credential_store, event_store));
    }

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database initialized");

    let credential_store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool.clone()));
    let event_store: Arc<dyn EventStore> = Arc::new(PgEventStore::new(pool.clone()));

    Ok((Some(pool), credential_store, event_store))
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }
}

/// 打印帮助信息
fn print_help() {
    println!("auth-gateway {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: auth-gateway [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过 GATEWAY_ 前缀的环境变量完成");
    println!("  必填: GATEWAY_SECURITY__JWT_SECRET（至少 32 字符）");
    println!("  可用选项请参考 .env.example");
}
