//! # 期相模拟服务 — 进程入口
//!
//! 本文件仅负责日志初始化、设置加载、监听与优雅退出。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use phase_sim::error::AppError;
use phase_sim::server;
use phase_sim::settings::ServerSettings;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        log::error!("服务启动失败: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let settings = ServerSettings::load()?;
    let addr = settings.socket_addr()?;
    let app = server::build_router(&settings)?;

    let listener = TcpListener::bind(addr).await?;
    log::info!(
        "startup: listening on {} (origins={:?}, max_upload={} bytes)",
        listener.local_addr()?,
        settings.allowed_origins,
        settings.max_upload_bytes
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("shutdown: complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("监听 Ctrl-C 失败: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::warn!("监听 SIGTERM 失败: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("shutdown: signal received");
}
