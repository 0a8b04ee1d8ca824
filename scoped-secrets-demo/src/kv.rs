use std::collections::HashMap;

use tokio::sync::RwLock;

/// In-process stand-in for an edge KV namespace, handed to requests as a resource.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.write().await.insert(key.into(), value.into());
    }
}
