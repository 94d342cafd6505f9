//! Per-user vector store backed by Qdrant.
//!
//! Each user owns one collection (`user_{id}`) with cosine distance.
//! Uploading a new document replaces the collection wholesale.

use crate::embedding::EmbeddingEngine;
use crate::errors::{BotError, Result};
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        vectors_config::Config, with_payload_selector::SelectorOptions, CreateCollection,
        Distance, PointStruct, SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Abstraction over the per-user document store.
///
/// The orchestrator and RAG session depend on this trait; tests supply an
/// in-memory implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether the user has an indexed document
    async fn exists(&self, user_id: i64) -> Result<bool>;

    /// Retrieve the `k` chunks most similar to `query`
    async fn search(&self, user_id: i64, query: &str, k: usize) -> Result<Vec<String>>;

    /// Replace the user's store with `chunks`
    async fn replace(&self, user_id: i64, chunks: &[String]) -> Result<()>;

    /// Drop the user's store entirely
    async fn remove(&self, user_id: i64) -> Result<()>;
}

/// Qdrant-backed implementation of [`DocumentStore`]
pub struct QdrantStore {
    client: QdrantClient,
    embeddings: Arc<EmbeddingEngine>,
}

fn collection_name(user_id: i64) -> String {
    format!("user_{}", user_id)
}

impl QdrantStore {
    pub fn new(url: &str, embeddings: Arc<EmbeddingEngine>) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| BotError::Vector(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self { client, embeddings })
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        self.client
            .create_collection(&CreateCollection {
                collection_name: name.to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.embeddings.dimension() as u64,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| BotError::Vector(format!("Failed to create collection {}: {}", name, e)))?;
        Ok(())
    }

    async fn embed_blocking(&self, text: String) -> Result<Vec<f32>> {
        let engine = Arc::clone(&self.embeddings);
        tokio::task::spawn_blocking(move || engine.embed(&text))
            .await
            .map_err(|e| BotError::Generic(format!("Embedding task panicked: {}", e)))?
            .map_err(|e| BotError::Vector(format!("Embedding failed: {}", e)))
    }
}

#[async_trait]
impl DocumentStore for QdrantStore {
    async fn exists(&self, user_id: i64) -> Result<bool> {
        let name = collection_name(user_id);
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| BotError::Vector(format!("Failed to list collections: {}", e)))?;
        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    async fn search(&self, user_id: i64, query: &str, k: usize) -> Result<Vec<String>> {
        if !self.exists(user_id).await? {
            return Err(BotError::NotIndexed { user_id });
        }

        let query_vec = self.embed_blocking(query.to_string()).await?;
        let name = collection_name(user_id);

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: name,
                vector: query_vec,
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| BotError::Vector(format!("Search failed: {}", e)))?;

        let chunks = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                point.payload.get("document").and_then(|v| {
                    use qdrant_client::qdrant::value::Kind;
                    match v.kind.as_ref() {
                        Some(Kind::StringValue(s)) => Some(s.clone()),
                        _ => None,
                    }
                })
            })
            .collect();

        Ok(chunks)
    }

    async fn replace(&self, user_id: i64, chunks: &[String]) -> Result<()> {
        let name = collection_name(user_id);

        // Drop the old store first; a re-upload is a full replacement
        if self.exists(user_id).await? {
            self.client
                .delete_collection(&name)
                .await
                .map_err(|e| BotError::Vector(format!("Failed to drop collection: {}", e)))?;
        }
        self.create_collection(&name).await?;

        if chunks.is_empty() {
            return Ok(());
        }

        let engine = Arc::clone(&self.embeddings);
        let texts: Vec<String> = chunks.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
            engine.embed_batch(&refs)
        })
        .await
        .map_err(|e| BotError::Generic(format!("Embedding task panicked: {}", e)))?
        .map_err(|e| BotError::Vector(format!("Embedding failed: {}", e)))?;

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (chunk, embedding))| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert("document".to_string(), QdrantValue::from(chunk.clone()));
                payload.insert("position".to_string(), QdrantValue::from(i as i64));
                PointStruct::new(Uuid::new_v4().to_string(), embedding, payload)
            })
            .collect();

        self.client
            .upsert_points_blocking(collection_name(user_id), None, points, None)
            .await
            .map_err(|e| BotError::Vector(format!("Failed to upsert points: {}", e)))?;

        Ok(())
    }

    async fn remove(&self, user_id: i64) -> Result<()> {
        let name = collection_name(user_id);
        if self.exists(user_id).await? {
            self.client
                .delete_collection(&name)
                .await
                .map_err(|e| BotError::Vector(format!("Failed to drop collection: {}", e)))?;
        }
        Ok(())
    }
}
