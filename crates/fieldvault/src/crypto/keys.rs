//! Key material: loading from configuration, fallback derivation, generation.

use std::cmp::Ordering;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Passphrase used when no key is configured. Development convenience only;
/// any deployment holding real data must configure `ENCRYPTION_KEY`.
const FALLBACK_PASSPHRASE: &[u8] = b"fieldvault-dev-only-passphrase";

/// Fixed salt for the fallback derivation.
const FALLBACK_SALT: &[u8] = b"fieldvault-key-salt-v1";

/// Provenance of the loaded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Decoded from the configured base64 value.
    Configured,
    /// Derived from the built-in passphrase because no usable key was
    /// configured.
    DerivedFallback,
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which key material lives in RAM.
#[derive(Clone)]
pub struct KeyBytes(pub(crate) Box<[u8; KEY_LEN]>);

impl Drop for KeyBytes {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Loaded key bytes plus the provenance flag.
///
/// Callers cannot tell which loading path ran except via [`KeyMaterial::source`]
/// and the warning logged at load time.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub(crate) bytes: KeyBytes,
    /// Which path produced the key.
    pub source: KeySource,
}

impl KeyMaterial {
    /// Load key material from an optional base64-encoded configuration value.
    ///
    /// A decoded key shorter than [`KEY_LEN`] bytes is zero-padded on the
    /// right; a longer one is truncated. Both cases indicate a misconfigured
    /// key and log a warning. An absent, empty, or undecodable value falls
    /// back to a key derived from a built-in passphrase — loudly, since that
    /// path is strictly weaker than a configured random key.
    pub fn load(configured: Option<&str>) -> Self {
        let encoded = match configured.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => {
                warn!("no encryption key configured; deriving fallback key from built-in passphrase");
                return Self::derive_fallback();
            }
        };

        match STANDARD.decode(encoded) {
            Ok(raw) => Self::from_raw(&raw),
            Err(_) => {
                warn!("configured encryption key is not valid base64; deriving fallback key");
                Self::derive_fallback()
            }
        }
    }

    /// Build key material from explicit raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: KeyBytes(Box::new(bytes)),
            source: KeySource::Configured,
        }
    }

    fn from_raw(raw: &[u8]) -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        match raw.len().cmp(&KEY_LEN) {
            Ordering::Equal => buf.copy_from_slice(raw),
            Ordering::Less => {
                warn!(
                    got = raw.len(),
                    expected = KEY_LEN,
                    "configured encryption key is too short; zero-padding on the right"
                );
                buf[..raw.len()].copy_from_slice(raw);
            }
            Ordering::Greater => {
                warn!(
                    got = raw.len(),
                    expected = KEY_LEN,
                    "configured encryption key is too long; truncating"
                );
                buf.copy_from_slice(&raw[..KEY_LEN]);
            }
        }
        Self {
            bytes: KeyBytes(buf),
            source: KeySource::Configured,
        }
    }

    /// Deterministic fallback: SHA-256 over the fixed salt and passphrase.
    fn derive_fallback() -> Self {
        let digest = Sha256::new()
            .chain_update(FALLBACK_SALT)
            .chain_update(FALLBACK_PASSPHRASE)
            .finalize();
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(&digest);
        Self {
            bytes: KeyBytes(buf),
            source: KeySource::DerivedFallback,
        }
    }
}

/// Generate a fresh cryptographically random 32-byte key, base64-encoded
/// for placing into configuration. Pure generator; touches no running state.
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    STANDARD.encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_length_key_used_as_is() {
        let raw = [0x42u8; KEY_LEN];
        let material = KeyMaterial::load(Some(&STANDARD.encode(raw)));
        assert_eq!(material.source, KeySource::Configured);
        assert_eq!(&material.bytes.0[..], &raw[..]);
    }

    #[test]
    fn short_key_is_zero_padded() {
        let material = KeyMaterial::load(Some(&STANDARD.encode([0xAAu8; 10])));
        assert_eq!(material.source, KeySource::Configured);
        assert_eq!(&material.bytes.0[..10], &[0xAAu8; 10]);
        assert_eq!(&material.bytes.0[10..], &[0u8; 22]);
    }

    #[test]
    fn long_key_is_truncated() {
        let mut raw = [0u8; 40];
        for (i, b) in raw.iter_mut().enumerate() {
            *b = i as u8;
        }
        let material = KeyMaterial::load(Some(&STANDARD.encode(raw)));
        assert_eq!(material.source, KeySource::Configured);
        assert_eq!(&material.bytes.0[..], &raw[..KEY_LEN]);
    }

    #[test]
    fn absent_key_derives_fallback_deterministically() {
        let a = KeyMaterial::load(None);
        let b = KeyMaterial::load(Some("   "));
        assert_eq!(a.source, KeySource::DerivedFallback);
        assert_eq!(b.source, KeySource::DerivedFallback);
        assert_eq!(&a.bytes.0[..], &b.bytes.0[..]);
    }

    #[test]
    fn invalid_base64_derives_fallback() {
        let material = KeyMaterial::load(Some("not base64 at all!!"));
        assert_eq!(material.source, KeySource::DerivedFallback);
    }

    #[test]
    fn fallback_differs_from_zero_key() {
        let fallback = KeyMaterial::load(None);
        assert_ne!(&fallback.bytes.0[..], &[0u8; KEY_LEN][..]);
    }

    #[test]
    fn generate_key_is_32_random_bytes() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(STANDARD.decode(&a).unwrap().len(), KEY_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn key_bytes_redacted_in_debug() {
        let material = KeyMaterial::from_bytes([0xFFu8; KEY_LEN]);
        assert!(format!("{material:?}").contains("REDACTED"));
    }
}
