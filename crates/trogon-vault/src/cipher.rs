//! AES-256-GCM sealing of single secret strings.

use std::fmt;

use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use zeroize::{Zeroize, Zeroizing};

use crate::envelope::{Envelope, NONCE_LEN, TAG_LEN};
use crate::error::VaultError;

/// Encryption key length in bytes.
pub const KEY_LEN: usize = 32;

/// The process-wide vault key. Zeroized on drop, never printed.
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Parse a 64-character hex key. Errors never echo the input.
    pub fn from_hex(encoded: &str) -> Result<Self, VaultError> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|_| VaultError::Configuration("encryption key is not valid hex".into()))?;
        if bytes.len() != KEY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(VaultError::Configuration(format!(
                "encryption key must be {KEY_LEN} bytes, got {len}"
            )));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self::from_bytes(key))
    }

    /// A random key, for tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&key);
        Self::from_bytes(bytes)
    }

    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(***)")
    }
}

/// Encrypts and decrypts credential plaintexts under one [`EncryptionKey`].
///
/// Stateless apart from the key schedule; safe to share across tasks.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Seal `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<Envelope, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut buffer = plaintext.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, b"", &mut buffer)
            .map_err(|_| VaultError::Encryption)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(&nonce);
        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(&tag);
        Ok(Envelope::new(nonce_bytes, tag_bytes, buffer))
    }

    /// Verify and open an envelope.
    ///
    /// A failed tag check, or plaintext that is not UTF-8, is
    /// [`VaultError::Authentication`].
    pub fn decrypt(&self, envelope: &Envelope) -> Result<Zeroizing<String>, VaultError> {
        let mut buffer = Zeroizing::new(envelope.ciphertext().to_vec());
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(envelope.nonce()),
                b"",
                buffer.as_mut_slice(),
                Tag::from_slice(envelope.tag()),
            )
            .map_err(|_| VaultError::Authentication)?;

        let plaintext = String::from_utf8(std::mem::take(&mut *buffer)).map_err(|err| {
            let mut bytes = err.into_bytes();
            bytes.zeroize();
            VaultError::Authentication
        })?;
        Ok(Zeroizing::new(plaintext))
    }

    /// [`encrypt`](Self::encrypt) straight to the `nonce:tag:ciphertext` text form.
    pub fn encrypt_to_string(&self, plaintext: &str) -> Result<String, VaultError> {
        self.encrypt(plaintext).map(|envelope| envelope.to_string())
    }

    /// Parse the text form and [`decrypt`](Self::decrypt) it.
    pub fn decrypt_str(&self, encoded: &str) -> Result<Zeroizing<String>, VaultError> {
        let envelope: Envelope = encoded.parse()?;
        self.decrypt(&envelope)
    }
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialCipher")
    }
}
