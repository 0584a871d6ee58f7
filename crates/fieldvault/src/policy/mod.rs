//! Field migration policy: lazy encrypt-on-write, decrypt-on-read.
//!
//! Documents written before encryption existed coexist permanently with
//! encrypted ones; there is no migration job and no "migration complete"
//! marker. Every write encrypts the designated fields that are not already
//! in envelope form, and every read decrypts unconditionally — decrypting
//! legacy plaintext is a no-op. Reads additionally report which designated
//! fields held legacy plaintext so callers may opportunistically re-save
//! (and thereby upgrade) the document.
//!
//! # Module invariants
//!
//! - **No key material.** The policy decides *when* to encrypt or decrypt;
//!   only the injected [`Cipher`] touches key bytes.
//! - A read never fails because of a field that cannot be decrypted.

mod fields;

use common::{Document, EntityKind};
use serde_json::Value;
use tracing::debug;

use crate::crypto::cipher::{Cipher, CipherError};

/// Entity-to-sensitive-field mapping plus the read/write drivers.
///
/// Stateless and freely copyable; holds no key material.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPolicy;

/// Informational result of a policy read: which designated fields held
/// legacy plaintext going in. Never a reason to fail or retry the read —
/// at most a hint that re-saving the document would upgrade it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptReport {
    /// Designated fields in which at least one legacy plaintext string was
    /// encountered.
    pub legacy_fields: Vec<String>,
}

impl DecryptReport {
    /// `true` when the document would be upgraded by a re-save.
    pub fn has_legacy(&self) -> bool {
        !self.legacy_fields.is_empty()
    }
}

impl FieldPolicy {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }

    /// Sensitive fields for an entity kind.
    pub fn sensitive_fields(&self, kind: EntityKind) -> &'static [&'static str] {
        fields::sensitive_fields(kind)
    }

    /// Prepare a document for persistence: encrypt every designated field
    /// whose value is not already recognised as ciphertext.
    ///
    /// # Errors
    ///
    /// Propagates [`CipherError`]; the caller must abort the write rather
    /// than persist plaintext under the encrypted-field contract.
    pub fn encrypt_document(
        &self,
        cipher: &Cipher,
        kind: EntityKind,
        doc: &Document,
    ) -> Result<Document, CipherError> {
        cipher.encrypt_fields(doc, self.sensitive_fields(kind))
    }

    /// Decrypt a fetched document, reporting any legacy plaintext it held.
    ///
    /// The returned document always carries plaintext in designated fields
    /// regardless of the stored representation; undecryptable values keep
    /// their stored form.
    pub fn decrypt_document(
        &self,
        cipher: &Cipher,
        kind: EntityKind,
        doc: &Document,
    ) -> (Document, DecryptReport) {
        let fields = self.sensitive_fields(kind);
        let report = DecryptReport {
            legacy_fields: legacy_fields_in(doc, fields),
        };
        if report.has_legacy() {
            debug!(
                entity = kind.collection(),
                fields = ?report.legacy_fields,
                "legacy plaintext fields encountered"
            );
        }
        (cipher.decrypt_fields(doc, fields), report)
    }
}

/// Designated fields whose current value contains legacy plaintext.
fn legacy_fields_in(doc: &Document, fields: &[&str]) -> Vec<String> {
    let map = match doc.as_object() {
        Some(m) => m,
        None => return Vec::new(),
    };
    let mut legacy = Vec::new();
    for &field in fields {
        let is_legacy = match map.get(field) {
            Some(Value::String(s)) => !Cipher::is_encrypted(s),
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| matches!(item, Value::String(s) if !Cipher::is_encrypted(s))),
            _ => false,
        };
        if is_legacy {
            legacy.push(field.to_owned());
        }
    }
    legacy
}
