use super::{Document, DocumentStore};
use crate::errors::RateError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local document store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<DashMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, key: &str) -> Result<Option<Document>, RateError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    /// Replaces the whole document
    async fn set_document(&self, key: &str, fields: Document) -> Result<(), RateError> {
        self.inner.insert(key.to_string(), fields);
        Ok(())
    }
}
