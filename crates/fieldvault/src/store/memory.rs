//! In-memory [`Backend`] keyed by entity kind and document id.
//!
//! Serves tests and local development; production deployments wire the
//! same trait to the document database. Also the seam through which tests
//! seed raw stored representations (legacy plaintext, corrupted
//! envelopes) without going through the policy.

use std::collections::HashMap;

use async_trait::async_trait;
use common::{Document, EntityKind};
use tokio::sync::RwLock;

use super::{Backend, StoreError};

/// Map-of-maps store guarded by a tokio `RwLock`: many concurrent readers,
/// one writer at a time.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<EntityKind, HashMap<String, Document>>>,
}

impl MemoryBackend {
    /// Create a new, empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, bypassing the policy.
    pub async fn seed(&self, kind: EntityKind, id: &str, doc: Document) {
        self.collections
            .write()
            .await
            .entry(kind)
            .or_default()
            .insert(id.to_owned(), doc);
    }

    /// Raw stored representation of a document, bypassing the policy.
    pub async fn raw(&self, kind: EntityKind, id: &str) -> Option<Document> {
        self.collections
            .read()
            .await
            .get(&kind)
            .and_then(|collection| collection.get(id))
            .cloned()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn insert(&self, kind: EntityKind, id: &str, doc: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(kind).or_default();
        if collection.contains_key(id) {
            return Err(StoreError::Backend(format!(
                "duplicate id in {}: {id}",
                kind.collection()
            )));
        }
        collection.insert(id.to_owned(), doc);
        Ok(())
    }

    async fn replace(&self, kind: EntityKind, id: &str, doc: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(kind).or_default();
        match collection.get_mut(id) {
            Some(slot) => {
                *slot = doc;
                Ok(())
            }
            None => Err(StoreError::MissingDocument {
                collection: kind.collection(),
                id: id.to_owned(),
            }),
        }
    }

    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.raw(kind, id).await)
    }

    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&kind)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn remove(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(&kind)
            .map(|collection| collection.remove(id).is_some())
            .unwrap_or(false))
    }
}
