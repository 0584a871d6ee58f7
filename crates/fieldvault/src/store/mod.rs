//! Document store façade that applies the field policy around every read
//! and write.
//!
//! The contract with callers: "get" always returns fully decrypted
//! documents regardless of the on-disk representation, and "save" always
//! persists ciphertext envelopes for designated fields regardless of what
//! the in-memory value held. Backends only ever see the stored
//! representation.
//!
//! Persistence-layer concurrency (read-modify-write races on the same
//! document) stays with the caller; this layer adds no ordering guarantee
//! beyond per-call correctness.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Document, EntityKind, ServiceError};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::crypto::cipher::{Cipher, CipherError};
use crate::policy::FieldPolicy;

/// Errors from the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A designated field could not be encrypted; the write was aborted.
    #[error("encryption failure: {0}")]
    Encryption(#[from] CipherError),

    /// The backend rejected the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// No document with the given id exists.
    #[error("no such document: {collection}/{id}")]
    MissingDocument {
        /// Backing collection name.
        collection: &'static str,
        /// Document id.
        id: String,
    },
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Encryption(e) => ServiceError::EncryptionFailure(e.to_string()),
            StoreError::Backend(msg) => ServiceError::Internal(msg),
            StoreError::MissingDocument { collection, id } => {
                ServiceError::NotFound(format!("{collection}/{id}"))
            }
        }
    }
}

/// Persistence backend behind the store façade.
///
/// Production deployments wire this to the document database; tests and
/// local development use [`memory::MemoryBackend`]. Implementations see
/// only stored representations and never key material.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Insert a new document under `id`.
    async fn insert(&self, kind: EntityKind, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Replace the document stored under `id`.
    async fn replace(&self, kind: EntityKind, id: &str, doc: Document) -> Result<(), StoreError>;

    /// Fetch one document by id.
    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Option<Document>, StoreError>;

    /// Fetch every document of a kind.
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Document>, StoreError>;

    /// Remove a document; returns whether it existed.
    async fn remove(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError>;
}

/// Policy-applying document store.
///
/// Cheap to clone; the cipher and backend are shared.
#[derive(Clone)]
pub struct EncryptedStore {
    backend: Arc<dyn Backend>,
    cipher: Arc<Cipher>,
    policy: FieldPolicy,
}

impl EncryptedStore {
    /// Build a store over a backend with an injected cipher.
    pub fn new(backend: Arc<dyn Backend>, cipher: Arc<Cipher>) -> Self {
        Self {
            backend,
            cipher,
            policy: FieldPolicy::new(),
        }
    }

    /// Create a document; returns the generated id.
    ///
    /// Designated fields are encrypted before the backend sees the
    /// document.
    ///
    /// # Errors
    ///
    /// [`StoreError::Encryption`] aborts the write — plaintext is never
    /// persisted under the encrypted-field contract.
    pub async fn create(&self, kind: EntityKind, doc: &Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let mut stored = self.policy.encrypt_document(&self.cipher, kind, doc)?;
        if let Some(map) = stored.as_object_mut() {
            map.insert("_id".into(), Document::from(id.clone()));
        }
        self.backend.insert(kind, &id, stored).await?;
        Ok(id)
    }

    /// Replace the document stored under `id`.
    ///
    /// Re-saving a document that was read with legacy plaintext upgrades it
    /// to envelope form in place — this is the lazy migration path.
    pub async fn update(&self, kind: EntityKind, id: &str, doc: &Document) -> Result<(), StoreError> {
        let mut stored = self.policy.encrypt_document(&self.cipher, kind, doc)?;
        if let Some(map) = stored.as_object_mut() {
            map.insert("_id".into(), Document::from(id.to_owned()));
        }
        self.backend.replace(kind, id, stored).await
    }

    /// Fetch one document, fully decrypted.
    ///
    /// Legacy plaintext fields are logged (informational only); the caller
    /// always receives plaintext either way.
    pub async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Document>, StoreError> {
        let stored = match self.backend.fetch(kind, id).await? {
            Some(doc) => doc,
            None => return Ok(None),
        };
        let (doc, report) = self.policy.decrypt_document(&self.cipher, kind, &stored);
        if report.has_legacy() {
            info!(
                entity = kind.collection(),
                id,
                fields = ?report.legacy_fields,
                "document holds legacy plaintext; next save will encrypt it"
            );
        }
        Ok(Some(doc))
    }

    /// Fetch every document of a kind, each decrypted independently.
    ///
    /// One document's undecryptable field never affects its siblings: the
    /// bad field comes back in stored form, the rest of the batch decrypts
    /// normally, and the batch itself always succeeds.
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Document>, StoreError> {
        let stored = self.backend.fetch_all(kind).await?;
        let mut out = Vec::with_capacity(stored.len());
        let mut legacy_count = 0usize;
        for doc in &stored {
            let (decrypted, report) = self.policy.decrypt_document(&self.cipher, kind, doc);
            if report.has_legacy() {
                legacy_count += 1;
            }
            out.push(decrypted);
        }
        if legacy_count > 0 {
            info!(
                entity = kind.collection(),
                count = legacy_count,
                "listed documents holding legacy plaintext"
            );
        }
        Ok(out)
    }

    /// Remove a document; returns whether it existed.
    pub async fn delete(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        self.backend.remove(kind, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{KeyMaterial, KEY_LEN};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use memory::MemoryBackend;
    use serde_json::json;

    fn store_with_backend() -> (EncryptedStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let cipher = Arc::new(Cipher::new(KeyMaterial::from_bytes([9u8; KEY_LEN])));
        (EncryptedStore::new(backend.clone(), cipher), backend)
    }

    #[tokio::test]
    async fn create_then_get_round_trips_plaintext() {
        let (store, backend) = store_with_backend();
        let doc = json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "phone": "555-0123",
            "busRoute": 4,
        });
        let id = store.create(EntityKind::Contact, &doc).await.unwrap();

        let read = store.get(EntityKind::Contact, &id).await.unwrap().unwrap();
        assert_eq!(read["firstName"], "Jane");
        assert_eq!(read["phone"], "555-0123");
        assert_eq!(read["busRoute"], 4);
        assert_eq!(read["_id"], json!(id));

        // On disk: designated fields are envelopes, the rest is untouched.
        let raw = backend.raw(EntityKind::Contact, &id).await.unwrap();
        assert!(Cipher::is_encrypted(raw["firstName"].as_str().unwrap()));
        assert!(Cipher::is_encrypted(raw["phone"].as_str().unwrap()));
        assert_eq!(raw["busRoute"], 4);
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (store, _) = store_with_backend();
        assert!(store
            .get(EntityKind::Contact, "nonexistent")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn legacy_document_reads_plaintext_and_update_upgrades_it() {
        let (store, backend) = store_with_backend();
        // Seed a pre-encryption document directly into the backend.
        backend
            .seed(
                EntityKind::Rider,
                "legacy-1",
                json!({"_id": "legacy-1", "firstName": "Sam", "phone": "555-0199"}),
            )
            .await;

        let read = store.get(EntityKind::Rider, "legacy-1").await.unwrap().unwrap();
        assert_eq!(read["firstName"], "Sam");

        store.update(EntityKind::Rider, "legacy-1", &read).await.unwrap();

        let raw = backend.raw(EntityKind::Rider, "legacy-1").await.unwrap();
        assert!(Cipher::is_encrypted(raw["firstName"].as_str().unwrap()));
        assert!(Cipher::is_encrypted(raw["phone"].as_str().unwrap()));

        // And the upgraded document still reads back as plaintext.
        let reread = store.get(EntityKind::Rider, "legacy-1").await.unwrap().unwrap();
        assert_eq!(reread["firstName"], "Sam");
        assert_eq!(reread["phone"], "555-0199");
    }

    #[tokio::test]
    async fn corrupted_field_is_isolated_in_list() {
        let (store, backend) = store_with_backend();
        for name in ["Ada", "Ben"] {
            store
                .create(EntityKind::Contact, &json!({"firstName": name}))
                .await
                .unwrap();
        }
        // Envelope-shaped but not block-aligned: undecryptable.
        let corrupt = STANDARD.encode(format!("{}:{}", "ab".repeat(16), "beef"));
        assert!(Cipher::is_encrypted(&corrupt));
        backend
            .seed(
                EntityKind::Contact,
                "bad-1",
                json!({"_id": "bad-1", "firstName": corrupt.clone(), "lastName": "Ng"}),
            )
            .await;

        let listed = store.list(EntityKind::Contact).await.unwrap();
        assert_eq!(listed.len(), 3);

        let bad = listed.iter().find(|d| d["_id"] == "bad-1").unwrap();
        // The corrupted field keeps its stored form; its siblings decrypt.
        assert_eq!(bad["firstName"], json!(corrupt));
        assert_eq!(bad["lastName"], "Ng");
        let names: Vec<_> = listed
            .iter()
            .filter(|d| d["_id"] != "bad-1")
            .map(|d| d["firstName"].as_str().unwrap().to_owned())
            .collect();
        assert!(names.contains(&"Ada".to_owned()));
        assert!(names.contains(&"Ben".to_owned()));
    }

    #[tokio::test]
    async fn update_missing_document_errors() {
        let (store, _) = store_with_backend();
        let err = store
            .update(EntityKind::Worker, "ghost", &json!({"firstName": "X"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingDocument { .. }));
        let service: ServiceError = err.into();
        assert_eq!(service.http_status(), 404);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let (store, _) = store_with_backend();
        let id = store
            .create(EntityKind::PrayerRequest, &json!({"request": "healing"}))
            .await
            .unwrap();
        assert!(store.delete(EntityKind::PrayerRequest, &id).await.unwrap());
        assert!(!store.delete(EntityKind::PrayerRequest, &id).await.unwrap());
    }

    #[tokio::test]
    async fn encryption_error_maps_to_500() {
        let err: ServiceError = StoreError::Encryption(CipherError::EncryptionFailed).into();
        assert_eq!(err.http_status(), 500);
    }
}
