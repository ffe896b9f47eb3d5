//! Durable key-value storage behind the memory capability.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("memory I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("memory file is not a valid JSON object: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable key-value storage. Exposed to the model through the `remember`
/// and `recall` tools; the engine gives it no special treatment.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn save(&self, key: &str, value: &str) -> Result<(), MemoryError>;
    async fn get(&self, key: &str) -> Result<Option<String>, MemoryError>;
}

/// Memory backed by a flat JSON object file, load-modify-write under an
/// async mutex. A missing file reads as empty.
pub struct JsonFileMemory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileMemory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>, MemoryError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let value: Value = serde_json::from_str(&raw)?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => Err(MemoryError::Corrupt(serde::de::Error::custom(
                        "top-level value is not an object",
                    ))),
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl MemoryStore for JsonFileMemory {
    async fn save(&self, key: &str, value: &str) -> Result<(), MemoryError> {
        let _guard = self.lock.lock().await;
        let mut memory = self.load().await?;
        memory.insert(key.to_string(), Value::String(value.to_string()));
        let encoded = serde_json::to_string_pretty(&Value::Object(memory))?;
        tokio::fs::write(&self.path, encoded).await?;
        tracing::debug!(key, path = %self.path.display(), "memory saved");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, MemoryError> {
        let _guard = self.lock.lock().await;
        let memory = self.load().await?;
        Ok(memory
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
