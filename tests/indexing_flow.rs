//! Ingestion pipeline checks against an in-memory store.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use studybuddy::errors::{BotError, Result};
use studybuddy::index::store::DocumentStore;
use studybuddy::index::{split_text, DocumentIndexer};

/// In-memory [`DocumentStore`] recording every replace call
#[derive(Default)]
struct MemoryStore {
    collections: Mutex<std::collections::HashMap<i64, Vec<String>>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn exists(&self, user_id: i64) -> Result<bool> {
        Ok(self.collections.lock().unwrap().contains_key(&user_id))
    }

    async fn search(&self, user_id: i64, _query: &str, k: usize) -> Result<Vec<String>> {
        let collections = self.collections.lock().unwrap();
        let chunks = collections
            .get(&user_id)
            .ok_or(BotError::NotIndexed { user_id })?;
        Ok(chunks.iter().take(k).cloned().collect())
    }

    async fn replace(&self, user_id: i64, chunks: &[String]) -> Result<()> {
        self.collections
            .lock()
            .unwrap()
            .insert(user_id, chunks.to_vec());
        Ok(())
    }

    async fn remove(&self, user_id: i64) -> Result<()> {
        self.collections.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

#[tokio::test]
async fn test_missing_file_errors_and_writes_nothing() {
    let store = Arc::new(MemoryStore::default());
    let indexer = DocumentIndexer::new(store.clone(), 500, 100);

    let result = indexer.index(Path::new("/no/such/lecture.pdf"), 3).await;
    assert!(result.is_err());
    assert!(!store.exists(3).await.unwrap());
}

#[tokio::test]
async fn test_non_pdf_bytes_error_and_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, "это не PDF, а обычный текст").unwrap();

    let store = Arc::new(MemoryStore::default());
    let indexer = DocumentIndexer::new(store.clone(), 500, 100);

    let result = indexer.index(&path, 3).await;
    assert!(result.is_err());
    assert!(!store.exists(3).await.unwrap());
}

#[test]
fn test_split_defaults_match_indexing_parameters() {
    // Chunking with the production parameters keeps every chunk usable
    // as retrieval context
    let text = "Механика изучает движение тел. ".repeat(100);
    let chunks = split_text(&text, 500, 100);
    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(!chunk.trim().is_empty());
        assert!(chunk.chars().count() <= 650);
    }
}

#[tokio::test]
async fn test_reupload_replaces_chunks() {
    let store = Arc::new(MemoryStore::default());

    store
        .replace(1, &["старый конспект".to_string()])
        .await
        .unwrap();
    store
        .replace(1, &["новый конспект".to_string(), "вторая часть".to_string()])
        .await
        .unwrap();

    let found = store.search(1, "конспект", 10).await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|c| !c.contains("старый")));
}
