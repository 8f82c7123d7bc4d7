// src/store/redis_store.rs

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, RedisError};
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{CreativeStore, StoreError};

const MIN_RETRY_BACKOFF: Duration = Duration::from_millis(8);
const MAX_RETRY_BACKOFF: Duration = Duration::from_millis(512);

/// Redis 客户端配置
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// `host:port`
    pub addr: String,
    pub password: Option<String>,
    pub pool_size: usize,
    pub dial_timeout: Duration,
    pub max_retries: u32,
    /// 单次读取（含重试）的总耗时上限
    pub retry_budget: Duration,
    /// 连接空闲超过该时间即被回收
    pub idle_timeout: Duration,
    /// 连接存活超过该时间即被回收
    pub max_conn_age: Duration,
}

impl RedisStoreConfig {
    /// 生成连接 URL，密码按 userinfo 规则做百分号编码
    pub fn url(&self) -> Result<String, StoreError> {
        let mut url = Url::parse(&format!("redis://{}", self.addr))
            .map_err(|e| StoreError::Config(format!("invalid redis address {}: {}", self.addr, e)))?;
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            // set_password 不会转义 `%`
            url.set_password(Some(password.replace('%', "%25").as_str()))
                .map_err(|_| StoreError::Config(format!("redis address {} cannot carry a password", self.addr)))?;
        }
        Ok(url.into())
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

impl StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// 连接级错误的重试策略：指数退避，最多 `max_retries` 次，
/// 下一次退避会超出 `budget` 时直接返回最后一次的错误
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    budget: Duration,
}

impl RetryPolicy {
    async fn run<T, F, Fut>(&self, op: &'static str, key: &str, f: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let started = Instant::now();
        let mut attempt = 0;
        loop {
            match f().await {
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let backoff = retry_backoff(attempt + 1);
                    if started.elapsed() + backoff >= self.budget {
                        warn!(op, key, attempt, error = %err, "redis retry budget exhausted");
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(op, key, attempt, error = %err, "redis read failed, retrying");
                    time::sleep(backoff).await;
                }
                result => return result,
            }
        }
    }
}

/// **Redis 存储**
///
/// 进程启动时创建一次连接池，所有请求共享；
/// 后台任务按空闲时间和连接寿命回收连接。
pub struct RedisStore {
    pool: Pool,
    retry: RetryPolicy,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl RedisStore {
    pub async fn connect(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(config.dial_timeout);
        pool_config.timeouts.create = Some(config.dial_timeout);
        pool_config.timeouts.recycle = Some(config.dial_timeout);

        let mut cfg = Config::from_url(config.url()?);
        cfg.pool = Some(pool_config);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Config(e.to_string()))?;

        let reaper = Self::spawn_reaper(pool.clone(), config.idle_timeout, config.max_conn_age);
        let store = Self {
            pool,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                budget: config.retry_budget,
            },
            reaper: Mutex::new(Some(reaper)),
        };

        // 启动时探测一次，失败只告警，请求阶段会按 503 返回
        match store.ping().await {
            Ok(()) => info!(addr = %config.addr, "connected to redis"),
            Err(e) => warn!(addr = %config.addr, error = %e, "redis not reachable at startup"),
        }
        Ok(store)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn connection(&self) -> Result<Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn spawn_reaper(pool: Pool, idle_timeout: Duration, max_conn_age: Duration) -> JoinHandle<()> {
        let period = idle_timeout.min(max_conn_age).max(Duration::from_secs(1)) / 2;
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                if pool.is_closed() {
                    break;
                }
                pool.retain(|_, metrics| metrics.last_used() < idle_timeout && metrics.age() < max_conn_age);
                debug!(status = ?pool.status(), "redis pool reaped");
            }
        })
    }
}

fn retry_backoff(attempt: u32) -> Duration {
    let backoff = MIN_RETRY_BACKOFF.saturating_mul(1 << attempt.min(6));
    backoff.min(MAX_RETRY_BACKOFF)
}

#[async_trait]
impl CreativeStore for RedisStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        self.retry
            .run("HGETALL", key, move || async move {
                let mut conn = self.connection().await?;
                let fields: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;
                Ok(fields)
            })
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.retry
            .run("GET", key, move || async move {
                let mut conn = self.connection().await?;
                let value: Option<Vec<u8>> = conn.get(key).await?;
                Ok(value)
            })
            .await
    }

    async fn close(&self) {
        if let Ok(mut reaper) = self.reaper.lock() {
            if let Some(handle) = reaper.take() {
                handle.abort();
            }
        }
        self.pool.close();
        info!("redis pool closed");
    }
}
