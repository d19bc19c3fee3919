//! AES-256-GCM sealing of stored provider tokens.
//!
//! The key is the SHA-256 digest of the configured encryption key, so any
//! sufficiently long passphrase can be used. Every seal draws a fresh
//! 96-bit nonce from the OS RNG.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use cflink_core::traits::{ApiToken, CredentialCipher, EncryptedCredential};
use cflink_core::{Error, Result};
use sha2::{Digest, Sha256};

/// GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// `CredentialCipher` backed by AES-256-GCM
#[derive(Clone)]
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(passphrase: &str) -> Result<Self> {
        let key = Sha256::digest(passphrase.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|_| Error::crypto("Invalid encryption key length"))?;
        Ok(Self { cipher })
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesGcmCipher([REDACTED])")
    }
}

impl CredentialCipher for AesGcmCipher {
    fn encrypt(&self, token: &ApiToken) -> Result<EncryptedCredential> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, token.expose().as_bytes())
            .map_err(|_| Error::crypto("Failed to encrypt provider token"))?;

        Ok(EncryptedCredential {
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    fn decrypt(&self, credential: &EncryptedCredential) -> Result<ApiToken> {
        if credential.nonce.len() != NONCE_LEN {
            return Err(Error::crypto("Stored credential has a malformed nonce"));
        }

        let nonce = Nonce::from_slice(&credential.nonce);
        let plaintext = self
            .cipher
            .decrypt(nonce, credential.ciphertext.as_slice())
            .map_err(|_| Error::crypto("Failed to decrypt provider token"))?;

        let token = String::from_utf8(plaintext)
            .map_err(|_| Error::crypto("Decrypted provider token is not valid UTF-8"))?;
        Ok(ApiToken::new(token))
    }
}
