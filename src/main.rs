// src/main.rs

use anyhow::{Context, Result};
use axum::serve;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

mod api;
mod bidding;
mod config;
mod logging;
mod model;
mod store;

use bidding::engine::TemplateResolver;
use config::{CliArgs, ConfigManager, StoreBackend};
use logging::logger::LogManager;
use logging::runtime_logger::RuntimeLogger;
use store::{CreativeStore, FileStore, RedisStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub resolver: TemplateResolver,
    pub runtime_logger: Arc<RuntimeLogger>,
    pub log_manager: Arc<LogManager>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(ConfigManager::from_args(CliArgs::parse()).context("Invalid configuration")?);

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&config.log_dir, "server_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber).context("Unable to set global tracing subscriber")?;
    info!(port = config.port, store = ?config.store, "bid server starting");

    // 运行日志（服务状态）和请求日志（每个 /bid 一行）
    let runtime_logger = RuntimeLogger::new(&config.log_dir, "runtime", 1000, 100, 1000, config.log_retention_hours);
    let log_manager = LogManager::new(&config.log_dir, 10_000, 500, 1000);
    runtime_logger.log("INFO", "Bid server is starting...").await;

    // 存储客户端只在启动时创建一次，所有请求共享
    let creative_store: Arc<dyn CreativeStore> = match config.store {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.redis)
                .await
                .context("Failed to create redis pool")?,
        ),
        StoreBackend::File => {
            let store = FileStore::load(&config.creatives_file).context("Failed to load creatives file")?;
            if store.is_empty() {
                warn!(file = %config.creatives_file.display(), "creatives file has no tracking records, every bid will be not_found");
            } else {
                info!(creatives = store.len(), file = %config.creatives_file.display(), "loaded creatives");
            }
            Arc::new(store)
        }
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        resolver: TemplateResolver::new(creative_store.clone(), config.request_timeout),
        runtime_logger: runtime_logger.clone(),
        log_manager: log_manager.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    runtime_logger.log("INFO", &format!("Bid server running at http://{}", addr)).await;
    info!(%addr, "bid server listening");

    serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    runtime_logger.log("INFO", "Shutting down gracefully...").await;
    creative_store.close().await;
    log_manager.shutdown().await;
    runtime_logger.log("INFO", "Bid server shut down.").await;
    runtime_logger.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
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
                warn!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
