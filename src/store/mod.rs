// src/store/mod.rs

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod file_store;
pub mod redis_store;

pub use file_store::FileStore;
pub use redis_store::{RedisStore, RedisStoreConfig};

/// 存储层错误（网络、连接池、命令失败），与 "key 不存在" 区分开
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Command(String),
    #[error("store configuration error: {0}")]
    Config(String),
}

/// **创意数据的只读存储接口**
///
/// - `hash_get_all`：读取 tracking hash，key 不存在时返回空 map
/// - `get`：读取模板，key 不存在时返回 `None`
///
/// 值一律按原始字节返回，不做编码校验。
#[async_trait]
pub trait CreativeStore: Send + Sync {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 进程退出前释放连接
    async fn close(&self) {}
}
