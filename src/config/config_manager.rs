// src/config/config_manager.rs

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;
use tokio::time::Duration;

use crate::store::RedisStoreConfig;

/// 创意数据来源
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    /// 从 JSON 文件加载到内存，本地调试用
    File,
}

#[derive(Parser, Debug, Clone)]
#[command(author = "whiteCcinn", version = "1.0", about = "A creative bid-response server")]
pub struct CliArgs {
    #[arg(short, long, env = "BID_PORT", default_value_t = 8000)]
    pub port: u16,
    /// `Authorization: Bearer <token>` 中的共享密钥
    #[arg(long, env = "BID_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,
    #[arg(long, env = "BID_LOG_DIR", default_value = "logs")]
    pub log_dir: String,
    #[arg(long, env = "BID_LOG_RETENTION_HOURS", default_value_t = 72)]
    pub log_retention_hours: u64,
    #[arg(long, env = "BID_REQUEST_TIMEOUT_MS", default_value_t = 250)]
    pub request_timeout_ms: u64,

    #[arg(long, env = "BID_STORE", value_enum, default_value_t = StoreBackend::Redis)]
    pub store: StoreBackend,
    #[arg(long, env = "BID_CREATIVES_FILE", default_value = "static/creatives.json")]
    pub creatives_file: PathBuf,

    #[arg(long, env = "REDIS_ADDR", default_value = "127.0.0.1:6379")]
    pub redis_addr: String,
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,
    #[arg(long, env = "REDIS_POOL_SIZE", default_value_t = 16)]
    pub redis_pool_size: usize,
    #[arg(long, env = "REDIS_DIAL_TIMEOUT_MS", default_value_t = 1000)]
    pub redis_dial_timeout_ms: u64,
    #[arg(long, env = "REDIS_MAX_RETRIES", default_value_t = 5)]
    pub redis_max_retries: u32,
    #[arg(long, env = "REDIS_IDLE_TIMEOUT_SECS", default_value_t = 180)]
    pub redis_idle_timeout_secs: u64,
    #[arg(long, env = "REDIS_MAX_CONN_AGE_SECS", default_value_t = 10)]
    pub redis_max_conn_age_secs: u64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("auth token must not be empty")]
    EmptyAuthToken,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// 运行期配置，启动时由命令行参数/环境变量构建并校验
#[derive(Clone, Debug)]
pub struct ConfigManager {
    pub port: u16,
    pub auth_token: String,
    pub log_dir: String,
    pub log_retention_hours: u64,
    pub request_timeout: Duration,
    pub store: StoreBackend,
    pub creatives_file: PathBuf,
    pub redis: RedisStoreConfig,
}

impl ConfigManager {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.auth_token.trim().is_empty() {
            return Err(ConfigError::EmptyAuthToken);
        }
        for (name, value) in [
            ("request-timeout-ms", args.request_timeout_ms),
            ("redis-pool-size", args.redis_pool_size as u64),
            ("redis-dial-timeout-ms", args.redis_dial_timeout_ms),
            ("redis-idle-timeout-secs", args.redis_idle_timeout_secs),
            ("redis-max-conn-age-secs", args.redis_max_conn_age_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        let request_timeout = Duration::from_millis(args.request_timeout_ms);
        Ok(ConfigManager {
            port: args.port,
            auth_token: args.auth_token,
            log_dir: args.log_dir,
            log_retention_hours: args.log_retention_hours,
            request_timeout,
            store: args.store,
            creatives_file: args.creatives_file,
            redis: RedisStoreConfig {
                addr: args.redis_addr,
                password: args.redis_password,
                pool_size: args.redis_pool_size,
                dial_timeout: Duration::from_millis(args.redis_dial_timeout_ms),
                max_retries: args.redis_max_retries,
                // 一次解析包含 HGETALL 和 GET 两次读取，每次最多占用一半的请求时限
                retry_budget: request_timeout / 2,
                idle_timeout: Duration::from_secs(args.redis_idle_timeout_secs),
                max_conn_age: Duration::from_secs(args.redis_max_conn_age_secs),
            },
        })
    }
}
