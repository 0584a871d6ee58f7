//! AES-256-CBC encryption and decryption of individual string fields.
//!
//! Every encrypted value carries its own random 16-byte IV inside the
//! envelope, so encrypting the same plaintext twice yields different stored
//! strings. Decryption is deliberately forgiving: values that do not match
//! the envelope shape are legacy plaintext and pass through unchanged, and
//! an envelope that fails to decrypt is returned as stored rather than
//! failing the read.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::keys::{KeyBytes, KeyMaterial, KeySource};
use common::Document;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Byte length of a CBC initialisation vector (one AES block).
pub const IV_LEN: usize = 16;

/// A parsed ciphertext envelope.
///
/// The stored representation is `base64( hex(iv) + ":" + hex(ciphertext) )`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Raw IV bytes.
    pub iv: [u8; IV_LEN],
    /// Raw ciphertext bytes.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encode this envelope to its stored string representation.
    pub fn encode(&self) -> String {
        let inner = format!("{}:{}", hex::encode(self.iv), hex::encode(&self.ciphertext));
        STANDARD.encode(inner)
    }

    /// Parse a stored string back into an [`Envelope`].
    ///
    /// Returns `None` when the value does not match the envelope shape:
    /// base64 wrapping two colon-separated hex parts, the first exactly
    /// 32 hex characters, the second non-empty. This is the detection
    /// heuristic, not an error path — a plaintext value that happens to
    /// match the shape is indistinguishable from ciphertext here.
    pub fn parse(value: &str) -> Option<Self> {
        let decoded = STANDARD.decode(value).ok()?;
        let text = std::str::from_utf8(&decoded).ok()?;
        let (iv_hex, ct_hex) = text.split_once(':')?;
        if iv_hex.len() != IV_LEN * 2 || ct_hex.is_empty() {
            return None;
        }
        // hex::decode rejects a stray ':' in the tail, enforcing the
        // exactly-two-parts invariant.
        let iv_bytes = hex::decode(iv_hex).ok()?;
        let ciphertext = hex::decode(ct_hex).ok()?;
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&iv_bytes);
        Some(Self { iv, ciphertext })
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The block cipher rejected the key or IV. Fatal to the enclosing
    /// write: callers must abort the persist operation rather than store
    /// plaintext under the encrypted-field contract.
    #[error("encryption failed")]
    EncryptionFailed,
}

/// Outcome of decrypting a single stored value.
///
/// The external contract is simply "you get a string back", but the tagged
/// form keeps the non-fatal fallback behaviour auditable in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// The value was a ciphertext envelope and decrypted cleanly.
    Decrypted(String),
    /// The value is not envelope-shaped; legacy plaintext passes through.
    NotEnvelope,
    /// Envelope-shaped but undecryptable (corrupt data, wrong key, or
    /// non-UTF-8 plaintext); the stored value is kept as-is.
    Failed,
}

/// AES-256-CBC cipher over individual string values.
///
/// Holds the process-wide symmetric key. Construct once at startup from
/// loaded [`KeyMaterial`] and inject wherever field encryption is needed —
/// there is no global key state. Immutable and safe to share across tasks:
/// every call only reads the key and builds a fresh cipher state.
pub struct Cipher {
    key: KeyBytes,
    source: KeySource,
}

impl Cipher {
    /// Build a cipher from loaded key material.
    pub fn new(material: KeyMaterial) -> Self {
        Self {
            key: material.bytes,
            source: material.source,
        }
    }

    /// Provenance of the key this cipher was built with.
    pub fn key_source(&self) -> KeySource {
        self.source
    }

    /// Encrypt a plaintext string into a ciphertext envelope.
    ///
    /// A fresh random IV is generated per call, so the same plaintext
    /// encrypts to a different envelope every time.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EncryptionFailed`] if the underlying cipher
    /// rejects the key or IV (unreachable with a [`KeyMaterial`]-loaded key).
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let enc = Aes256CbcEnc::new_from_slices(&self.key.0[..], &iv)
            .map_err(|_| CipherError::EncryptionFailed)?;
        let ciphertext = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        Ok(Envelope { iv, ciphertext }.encode())
    }

    /// Decrypt a stored value, reporting what happened.
    ///
    /// Shape detection runs first: values that are not envelopes come back
    /// as [`DecryptOutcome::NotEnvelope`] so the caller can treat them as
    /// legacy plaintext. Envelope-shaped values that fail to decrypt come
    /// back as [`DecryptOutcome::Failed`]. Neither case is an error.
    pub fn decrypt_value(&self, value: &str) -> DecryptOutcome {
        let envelope = match Envelope::parse(value) {
            Some(e) => e,
            None => return DecryptOutcome::NotEnvelope,
        };

        let dec = match Aes256CbcDec::new_from_slices(&self.key.0[..], &envelope.iv) {
            Ok(d) => d,
            Err(_) => return DecryptOutcome::Failed,
        };
        let plaintext = match dec.decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext) {
            Ok(p) => p,
            Err(_) => return DecryptOutcome::Failed,
        };
        match String::from_utf8(plaintext) {
            Ok(s) => DecryptOutcome::Decrypted(s),
            Err(_) => DecryptOutcome::Failed,
        }
    }

    /// Decrypt a stored value, returning the plaintext where possible.
    ///
    /// Legacy plaintext is returned unchanged. A failed decryption logs a
    /// warning and returns the stored value unchanged, so one bad field
    /// never breaks a read of many records.
    pub fn decrypt(&self, value: &str) -> String {
        match self.decrypt_value(value) {
            DecryptOutcome::Decrypted(plain) => plain,
            DecryptOutcome::NotEnvelope => value.to_owned(),
            DecryptOutcome::Failed => {
                warn!("undecryptable envelope-shaped value; returning stored form");
                value.to_owned()
            }
        }
    }

    /// Heuristic test for whether a stored value is a ciphertext envelope.
    ///
    /// Pure predicate: anything that fails base64 decoding or the shape
    /// test is plaintext. Never errors.
    pub fn is_encrypted(value: &str) -> bool {
        Envelope::parse(value).is_some()
    }

    /// Encrypt the named fields of a document.
    ///
    /// String fields are replaced by envelopes; array fields element-wise.
    /// Values already recognised as ciphertext are left byte-for-byte
    /// unchanged, so re-saving an encrypted document never double-wraps.
    /// Absent, null, and non-string values pass through untouched. The
    /// input document is not mutated.
    pub fn encrypt_fields(
        &self,
        doc: &Document,
        fields: &[&str],
    ) -> Result<Document, CipherError> {
        let mut out = doc.clone();
        if let Some(map) = out.as_object_mut() {
            for &field in fields {
                if let Some(value) = map.get_mut(field) {
                    self.encrypt_value_in_place(value)?;
                }
            }
        }
        Ok(out)
    }

    /// Decrypt the named fields of a document.
    ///
    /// The inverse of [`Cipher::encrypt_fields`], with the same pass-through
    /// rules; legacy plaintext and undecryptable values survive unchanged.
    /// The input document is not mutated.
    pub fn decrypt_fields(&self, doc: &Document, fields: &[&str]) -> Document {
        let mut out = doc.clone();
        if let Some(map) = out.as_object_mut() {
            for &field in fields {
                if let Some(value) = map.get_mut(field) {
                    self.decrypt_value_in_place(field, value);
                }
            }
        }
        out
    }

    fn encrypt_value_in_place(&self, value: &mut Value) -> Result<(), CipherError> {
        match value {
            Value::String(s) => {
                if !Self::is_encrypted(s) {
                    *s = self.encrypt(s)?;
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::String(s) = item {
                        if !Self::is_encrypted(s) {
                            *s = self.encrypt(s)?;
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn decrypt_value_in_place(&self, field: &str, value: &mut Value) {
        match value {
            Value::String(s) => {
                if let Some(plain) = self.decrypt_logged(field, s) {
                    *s = plain;
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::String(s) = item {
                        if let Some(plain) = self.decrypt_logged(field, s) {
                            *s = plain;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// `Some(plaintext)` when the stored value decrypted; `None` when it
    /// should be kept as-is. Logs undecryptable envelopes with the field
    /// name for context (never the value).
    fn decrypt_logged(&self, field: &str, stored: &str) -> Option<String> {
        match self.decrypt_value(stored) {
            DecryptOutcome::Decrypted(plain) => Some(plain),
            DecryptOutcome::NotEnvelope => None,
            DecryptOutcome::Failed => {
                warn!(field, "undecryptable ciphertext; keeping stored value");
                None
            }
        }
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("key", &self.key)
            .field("source", &self.source)
            .finish()
    }
}
