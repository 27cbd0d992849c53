//! Message encryption for the LSB channel.
//!
//! The key is an explicit [`KeyHandle`] loaded once at startup and passed to
//! [`AeadCipher`]; nothing here keeps global state. Ciphertext is
//! `nonce || AES-256-GCM(ct || tag)` and travels through the LSB channel as
//! standard base64.

use crate::error::{Result, StegoError};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose, Engine as _};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use tracing::info;
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

const AEAD_KEY_INFO: &[u8] = b"STEGOFRAME_HKDF_AES256_v1";

/// Encrypts the plaintext before it is sharded; both directions may fail.
pub trait EncryptionService: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Process-wide key material, zeroed on drop.
pub struct KeyHandle {
    secret: Zeroizing<[u8; KEY_LEN]>,
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHandle")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl KeyHandle {
    pub fn generate() -> Self {
        let mut secret = Zeroizing::new([0u8; KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut secret[..]);
        Self { secret }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(StegoError::KeyMaterial(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let mut secret = Zeroizing::new([0u8; KEY_LEN]);
        secret.copy_from_slice(bytes);
        Ok(Self { secret })
    }

    /// Read a base64 key file.
    pub fn load(path: &Path) -> Result<Self> {
        let encoded = Zeroizing::new(std::fs::read_to_string(path)?);
        let bytes = Zeroizing::new(
            general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| StegoError::KeyMaterial(format!("{}: {}", path.display(), e)))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Write the key as base64, owner-readable only on Unix.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = Zeroizing::new(general_purpose::STANDARD.encode(&self.secret[..]));
        std::fs::write(path, encoded.as_bytes())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Load the key at `path`, creating it first if it does not exist.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        let handle = if path.exists() {
            Self::load(path)?
        } else {
            let handle = Self::generate();
            handle.save(path)?;
            info!("Generated new key at {}", path.display());
            handle
        };
        info!("Using key {}", handle.fingerprint());
        Ok(handle)
    }

    /// First eight bytes of the key's SHA-256, hex encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.secret[..]);
        digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// AES-256-GCM keyed from a [`KeyHandle`] through HKDF-SHA256.
pub struct AeadCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl AeadCipher {
    pub fn new(handle: &KeyHandle) -> Self {
        Self {
            key: kdf_aead_key(&handle.secret),
        }
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(&self.key[..]))
    }
}

impl EncryptionService for AeadCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|_| StegoError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(StegoError::Decryption(format!(
                "ciphertext too short ({} bytes)",
                ciphertext.len()
            )));
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(GenericArray::from_slice(nonce), body)
            .map_err(|_| StegoError::Decryption("integrity check failed".to_string()))
    }
}

fn kdf_aead_key(secret: &[u8; KEY_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, secret);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    // 32 bytes is far below HKDF-SHA256's output limit.
    hk.expand(AEAD_KEY_INFO, &mut okm[..])
        .expect("HKDF expand should never fail with valid length");
    okm
}

/// Textual form of ciphertext used for sharding.
pub fn ciphertext_to_text(ciphertext: &[u8]) -> String {
    general_purpose::STANDARD.encode(ciphertext)
}

pub fn text_to_ciphertext(text: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| StegoError::Decryption(format!("ciphertext is not base64: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = AeadCipher::new(&KeyHandle::generate());
        let ct = cipher.encrypt(b"hello world").unwrap();
        assert_eq!(ct.len(), NONCE_LEN + 11 + TAG_LEN);
        assert_eq!(cipher.decrypt(&ct).unwrap(), b"hello world");
    }

    #[test]
    fn test_nonce_is_fresh() {
        let cipher = AeadCipher::new(&KeyHandle::generate());
        assert_ne!(cipher.encrypt(b"same").unwrap(), cipher.encrypt(b"same").unwrap());
    }

    #[test]
    fn test_decrypt_failures() {
        let cipher = AeadCipher::new(&KeyHandle::generate());
        let other = AeadCipher::new(&KeyHandle::generate());
        let mut ct = cipher.encrypt(b"payload").unwrap();

        assert!(matches!(other.decrypt(&ct), Err(StegoError::Decryption(_))));
        assert!(matches!(cipher.decrypt(&ct[..10]), Err(StegoError::Decryption(_))));
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(matches!(cipher.decrypt(&ct), Err(StegoError::Decryption(_))));
    }

    #[test]
    fn test_text_form() {
        let bytes = [0u8, 1, 2, 250, 255];
        let text = ciphertext_to_text(&bytes);
        assert!(!text.contains(','));
        assert_eq!(text_to_ciphertext(&text).unwrap(), bytes);
        assert!(text_to_ciphertext("not base64!").is_err());
    }

    #[test]
    fn test_key_from_bytes() {
        assert!(KeyHandle::from_bytes(&[7u8; KEY_LEN]).is_ok());
        assert!(matches!(
            KeyHandle::from_bytes(&[7u8; 16]),
            Err(StegoError::KeyMaterial(_))
        ));
        let a = KeyHandle::from_bytes(&[7u8; KEY_LEN]).unwrap();
        let b = KeyHandle::from_bytes(&[7u8; KEY_LEN]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
        assert!(!format!("{:?}", a).contains("secret"));
    }

    #[test]
    fn test_load_or_generate_persists() {
        let dir = std::env::temp_dir().join(format!("stegoframe-key-{}", std::process::id()));
        let path = dir.join("nested").join("stego.key");
        std::fs::remove_dir_all(&dir).ok();

        let first = KeyHandle::load_or_generate(&path).unwrap();
        assert!(path.exists());
        let second = KeyHandle::load_or_generate(&path).unwrap();
        assert_eq!(first.fingerprint(), second.fingerprint());

        let ct = AeadCipher::new(&first).encrypt(b"persisted").unwrap();
        assert_eq!(AeadCipher::new(&second).decrypt(&ct).unwrap(), b"persisted");

        std::fs::write(&path, "garbage").unwrap();
        assert!(KeyHandle::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
