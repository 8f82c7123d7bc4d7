// src/store/file_store.rs

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{CreativeStore, StoreError};

/// 静态文件中单个创意的数据
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CreativeEntry {
    #[serde(default)]
    pub tracking: HashMap<String, String>,
    #[serde(default)]
    pub js: Option<String>,
    #[serde(default)]
    pub xml: Option<String>,
}

/// 从 JSON 文件加载的内存存储，按 Redis 的 key 布局展开：
/// `<id>` 为 hash，`<id>_js` / `<id>_xml` 为字符串
#[derive(Debug, Default)]
pub struct FileStore {
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
    strings: HashMap<String, Vec<u8>>,
}

impl FileStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("unable to read {}: {}", path.display(), e)))?;
        let entries: HashMap<String, CreativeEntry> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Config(format!("unable to parse {}: {}", path.display(), e)))?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: HashMap<String, CreativeEntry>) -> Self {
        let mut store = Self::default();
        for (id, entry) in entries {
            if let Some(js) = entry.js {
                store.strings.insert(format!("{}_js", id), js.into_bytes());
            }
            if let Some(xml) = entry.xml {
                store.strings.insert(format!("{}_xml", id), xml.into_bytes());
            }
            if !entry.tracking.is_empty() {
                let tracking = entry
                    .tracking
                    .into_iter()
                    .map(|(field, value)| (field, value.into_bytes()))
                    .collect();
                store.hashes.insert(id, tracking);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[async_trait]
impl CreativeStore for FileStore {
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        Ok(self.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.strings.get(key).cloned())
    }
}
