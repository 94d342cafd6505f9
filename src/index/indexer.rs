//! PDF ingestion pipeline: extract text, split into chunks, replace the
//! user's vector store.

use crate::errors::{BotError, Result};
use crate::index::splitter::split_text;
use crate::index::store::DocumentStore;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a successful indexing run
#[derive(Debug, Clone)]
pub struct IndexReport {
    /// Characters of text extracted from the document
    pub text_len: usize,
    /// Number of chunks written to the store
    pub chunks: usize,
    /// When the store was replaced
    pub indexed_at: DateTime<Utc>,
}

/// Indexes uploaded documents into the per-user store
pub struct DocumentIndexer {
    store: Arc<dyn DocumentStore>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentIndexer {
    pub fn new(store: Arc<dyn DocumentStore>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            store,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Index a PDF for the given user, replacing any previous store.
    ///
    /// Extraction is CPU-bound and runs under `spawn_blocking`; the caller
    /// suspends until it completes.
    pub async fn index(&self, file_path: &Path, user_id: i64) -> Result<IndexReport> {
        let path: PathBuf = file_path.to_path_buf();

        tracing::info!(user_id, path = %path.display(), "indexing document");

        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
            .await
            .map_err(|e| BotError::Generic(format!("PDF extraction task panicked: {}", e)))?
            .map_err(|e| BotError::Generic(format!("PDF extraction failed: {}", e)))?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(BotError::EmptyDocument);
        }

        let chunks = split_text(&text, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            return Err(BotError::EmptyDocument);
        }

        self.store.replace(user_id, &chunks).await?;

        tracing::info!(user_id, chunks = chunks.len(), "document indexed");

        Ok(IndexReport {
            text_len: text.chars().count(),
            chunks: chunks.len(),
            indexed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory store capturing what the indexer writes
    struct RecordingStore {
        replaced: Mutex<Option<(i64, Vec<String>)>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn exists(&self, _user_id: i64) -> Result<bool> {
            Ok(self.replaced.lock().unwrap().is_some())
        }

        async fn search(&self, _user_id: i64, _query: &str, _k: usize) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn replace(&self, user_id: i64, chunks: &[String]) -> Result<()> {
            *self.replaced.lock().unwrap() = Some((user_id, chunks.to_vec()));
            Ok(())
        }

        async fn remove(&self, _user_id: i64) -> Result<()> {
            *self.replaced.lock().unwrap() = None;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let store = Arc::new(RecordingStore {
            replaced: Mutex::new(None),
        });
        let indexer = DocumentIndexer::new(store, 500, 100);

        let result = indexer
            .index(Path::new("/nonexistent/notes.pdf"), 1)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires a sample PDF fixture on disk
    async fn test_index_sample_pdf() {
        let store = Arc::new(RecordingStore {
            replaced: Mutex::new(None),
        });
        let indexer = DocumentIndexer::new(store.clone(), 500, 100);

        let report = indexer
            .index(Path::new("fixtures/lecture.pdf"), 7)
            .await
            .unwrap();
        assert!(report.chunks > 0);
        let replaced = store.replaced.lock().unwrap();
        assert_eq!(replaced.as_ref().unwrap().0, 7);
    }
}
