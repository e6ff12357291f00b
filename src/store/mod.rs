pub mod file;
pub mod memory;

use crate::config::{Config, StoreBackend};
use crate::errors::RateError;
use crate::models::{RateSnapshot, is_valid_rate};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

pub use file::FileDocumentStore;
pub use memory::MemoryDocumentStore;

/// A stored document: a flat JSON object.
pub type Document = Map<String, Value>;

/// Key-value document storage. Implementations normalize their own failures
/// into `RateError` and never panic.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, key: &str) -> Result<Option<Document>, RateError>;

    async fn set_document(&self, key: &str, fields: Document) -> Result<(), RateError>;
}

/// Builds the document store selected by the config.
pub fn from_config(config: &Config) -> Arc<dyn DocumentStore> {
    match &config.store {
        StoreBackend::Memory => Arc::new(MemoryDocumentStore::new()),
        StoreBackend::File(path) => Arc::new(FileDocumentStore::new(path.clone())),
    }
}

/// Persists the single saved snapshot under one fixed key.
#[derive(Clone)]
pub struct RateStore {
    documents: Arc<dyn DocumentStore>,
    key: String,
}

impl RateStore {
    pub fn new(documents: Arc<dyn DocumentStore>, key: impl Into<String>) -> Self {
        Self {
            documents,
            key: key.into(),
        }
    }

    /// Overwrites the saved snapshot. Invalid rates are rejected before
    /// anything is written.
    pub async fn save_rate(&self, snapshot: &RateSnapshot) -> Result<(), RateError> {
        // RateSnapshot::new already refuses these; kept so a future
        // constructor cannot write a bad document
        if !is_valid_rate(snapshot.rate()) {
            return Err(RateError::invalid_rate());
        }

        let mut fields = Document::new();
        fields.insert("rate".into(), Value::from(snapshot.rate()));
        fields.insert("timestamp".into(), Value::from(snapshot.timestamp()));

        self.documents.set_document(&self.key, fields).await?;
        tracing::debug!(key = %self.key, rate = snapshot.rate(), "saved rate snapshot");
        Ok(())
    }

    pub async fn load_rate(&self) -> Result<Option<RateSnapshot>, RateError> {
        let Some(fields) = self.documents.get_document(&self.key).await? else {
            return Ok(None);
        };

        let snapshot = parse_snapshot(&fields).ok_or_else(|| {
            tracing::warn!(key = %self.key, "stored rate document failed validation");
            RateError::invalid_stored_data()
        })?;

        Ok(Some(snapshot))
    }
}

fn parse_snapshot(fields: &Document) -> Option<RateSnapshot> {
    let rate = fields.get("rate")?.as_f64()?;

    let timestamp = match fields.get("timestamp")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    RateSnapshot::new(rate, timestamp).ok()
}
