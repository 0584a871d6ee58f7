//! Transparent field-level encryption for roster documents.
//!
//! Sensitive string fields (names, addresses, phone numbers, emails,
//! free-text requests) are stored as ciphertext envelopes while documents
//! written before encryption existed keep working unchanged. The subsystem
//! has three layers:
//!
//! - [`crypto`] — the AES-256-CBC cipher over individual string values, the
//!   envelope codec, and the ciphertext detector.
//! - [`policy`] — the per-entity sensitive-field mapping and the lazy
//!   encrypt-on-write / decrypt-on-read migration protocol.
//! - [`store`] — a thin document-store façade that applies the policy around
//!   every create, update, and read, over a pluggable [`store::Backend`].
//!
//! # Stored field format
//!
//! ```text
//! base64( hex(iv) ":" hex(ciphertext) )
//! ```
//!
//! Consumers reading raw persisted documents see this opaque string for
//! designated fields and must route it through [`Cipher::decrypt`] rather
//! than interpreting it directly.

pub mod config;
pub mod crypto;
pub mod policy;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use crypto::cipher::{Cipher, CipherError, DecryptOutcome};
pub use crypto::keys::{generate_key, KeyMaterial, KeySource, KEY_LEN};
pub use policy::{DecryptReport, FieldPolicy};
pub use store::{Backend, EncryptedStore, StoreError};
