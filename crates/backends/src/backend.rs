//! Enum dispatch over the five vector backends.
//!
//! Callers that pick a backend at runtime hold a `VectorBackend` instead of
//! a trait object, keeping the concrete store types reachable.

use async_trait::async_trait;
use omnivec_core::Filter;

use crate::error::BackendError;
use crate::milvus::MilvusStore;
use crate::pgvector::PgVectorStore;
use crate::pinecone::PineconeStore;
use crate::qdrant::QdrantStore;
use crate::traits::{ScoredPoint, VectorSearch};
use crate::weaviate::WeaviateStore;

/// One of the supported vector stores.
#[derive(Debug)]
pub enum VectorBackend {
    PgVector(PgVectorStore),
    Milvus(MilvusStore),
    Pinecone(PineconeStore),
    Qdrant(QdrantStore),
    Weaviate(WeaviateStore),
}

impl VectorBackend {
    /// Stable backend name, matching the one used in capability errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PgVector(_) => "pgvector",
            Self::Milvus(_) => "milvus",
            Self::Pinecone(_) => "pinecone",
            Self::Qdrant(_) => "qdrant",
            Self::Weaviate(_) => "weaviate",
        }
    }
}

#[async_trait]
impl VectorSearch for VectorBackend {
    async fn search(
        &self,
        query: &[f32],
        filter: Option<&Filter>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, BackendError> {
        match self {
            Self::PgVector(store) => store.search(query, filter, limit).await,
            Self::Milvus(store) => store.search(query, filter, limit).await,
            Self::Pinecone(store) => store.search(query, filter, limit).await,
            Self::Qdrant(store) => store.search(query, filter, limit).await,
            Self::Weaviate(store) => store.search(query, filter, limit).await,
        }
    }
}
