//! AES-256-CBC field encryption primitives.
//!
//! This module is intentionally free of policy and storage dependencies.
//! It provides the low-level encrypt/decrypt/detect operations the policy
//! layer drives.
//!
//! # Ciphertext format
//!
//! ```text
//! base64( hex(iv) ":" hex(ciphertext) )
//! ```
//!
//! The two-part colon shape, with a 32-hex-character IV, doubles as the
//! detection heuristic that lets legacy plaintext values coexist with
//! encrypted ones in the same collection.

pub mod cipher;
pub mod keys;

pub use cipher::{Cipher, CipherError, DecryptOutcome};
pub use keys::{generate_key, KeyMaterial, KeySource, KEY_LEN};
