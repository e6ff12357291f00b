use super::{Document, DocumentStore};
use crate::errors::RateError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Keeps every document in one JSON object on disk: `{ "<key>": { ... } }`.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
pub struct FileDocumentStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Map<String, Value>, RateError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            RateError::Network(format!(
                "store file {} is unreadable: {e}",
                self.path.display()
            ))
        })
    }

    async fn write_all(&self, documents: &Map<String, Value>) -> Result<(), RateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(documents)
            .map_err(|e| RateError::Unknown(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get_document(&self, key: &str) -> Result<Option<Document>, RateError> {
        let documents = self.read_all().await?;
        match documents.get(key) {
            None => Ok(None),
            Some(Value::Object(fields)) => Ok(Some(fields.clone())),
            // present but not an object; let the caller's validation reject it
            Some(_) => Ok(Some(Document::new())),
        }
    }

    async fn set_document(&self, key: &str, fields: Document) -> Result<(), RateError> {
        let _guard = self.write_lock.lock().await;

        let mut documents = self.read_all().await?;
        documents.insert(key.to_string(), Value::Object(fields));
        self.write_all(&documents).await?;

        tracing::debug!("wrote document '{key}' to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RateSnapshot;
    use crate::store::RateStore;
    use serde_json::json;
    use std::sync::Arc;

    fn fields(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().join("absent.json"));

        assert_eq!(store.get_document("saved_rate").await, Ok(None));
    }

    #[tokio::test]
    async fn documents_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let snapshot = RateSnapshot::new(65_432.1, 1_718_000_000_456).unwrap();
        RateStore::new(Arc::new(FileDocumentStore::new(&path)), "saved_rate")
            .save_rate(&snapshot)
            .await
            .unwrap();

        let reopened = RateStore::new(Arc::new(FileDocumentStore::new(&path)), "saved_rate");
        assert_eq!(reopened.load_rate().await, Ok(Some(snapshot)));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().join("store.json"));

        store.set_document("a", fields(json!({ "n": 1 }))).await.unwrap();
        store.set_document("b", fields(json!({ "n": 2 }))).await.unwrap();
        store.set_document("a", fields(json!({ "n": 3 }))).await.unwrap();

        assert_eq!(store.get_document("a").await, Ok(Some(fields(json!({ "n": 3 })))));
        assert_eq!(store.get_document("b").await, Ok(Some(fields(json!({ "n": 2 })))));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = FileDocumentStore::new(&path);
        assert!(matches!(
            store.get_document("saved_rate").await,
            Err(RateError::Network(_))
        ));
    }

    #[tokio::test]
    async fn non_object_entry_fails_rate_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, r#"{"saved_rate": 42}"#).await.unwrap();

        let store = RateStore::new(Arc::new(FileDocumentStore::new(&path)), "saved_rate");
        assert_eq!(store.load_rate().await, Err(RateError::invalid_stored_data()));
    }
}
