use async_trait::async_trait;
use thiserror::Error;

use crate::entities::Document;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("store authentication failed: {0}")]
    Auth(String),

    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed document storage, the only contract the pipeline needs from its
/// database. Implementations are shared across requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read `collection/id`; `Ok(None)` when the document does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or overwrite `collection/id`.
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError>;

    /// Cheap round trip proving the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
