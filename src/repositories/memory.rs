use async_trait::async_trait;
use dashmap::DashMap;

use crate::entities::Document;
use crate::repositories::document::{DocumentStore, StoreError};

/// Process-local store, for tests and single-node runs without Firestore.
#[derive(Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Snapshot of one document, bypassing the async trait.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.documents
            .get(&(collection.to_string(), id.to_string()))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.document(collection, id))
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<(), StoreError> {
        self.documents
            .insert((collection.to_string(), id.to_string()), document);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
