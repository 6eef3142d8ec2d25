//! 功能开关评估服务
//!
//! 启动时加载开关配置文件，之后从 stdin 逐行读取 JSON 评估请求，向 stdout 输出结果。

use anyhow::{Context, Result};
use flag_engine::request;
use flag_engine::{FileFlagSource, FlagStore};
use flag_shared::config::AppConfig;
use flag_shared::observability;
use tokio::io::{self, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load("flag-engine").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    observability::init(&obs_config)?;

    info!(environment = %config.environment, "Starting flag-engine...");

    let source = FileFlagSource::new(config.flags.path());
    let store = FlagStore::from_source(&source)
        .await
        .with_context(|| format!("加载开关配置失败: {:?}", source.path()))?;

    let stdin = BufReader::new(io::stdin());
    let stdout = io::stdout();

    tokio::select! {
        result = request::serve(&store, stdin, stdout) => {
            let handled = result.context("处理评估请求失败")?;
            info!(handled, "输入结束，退出");
        }
        _ = shutdown_signal() => {}
    }

    info!("Service shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
