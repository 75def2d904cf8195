//! Vector-store backends for omnivec
//!
//! One provider per backend, each translating the shared filter AST into
//! the backend's native filter grammar before issuing the native search
//! call. Translation is pure and synchronous; any filter that cannot be
//! translated fails the search before I/O happens.

mod backend;
mod config;
mod error;
pub mod milvus;
pub mod pgvector;
pub mod pinecone;
pub mod qdrant;
mod support;
#[cfg(test)]
mod tests;
mod traits;
pub mod weaviate;

pub use backend::VectorBackend;
pub use error::BackendError;
pub use milvus::MilvusStore;
pub use pgvector::PgVectorStore;
pub use pinecone::PineconeStore;
pub use qdrant::QdrantStore;
pub use traits::{ScoredPoint, VectorSearch};
pub use weaviate::WeaviateStore;
