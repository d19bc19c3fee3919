// # Credential Cipher Trait
//
// Provider API tokens are stored encrypted and only decrypted for the
// duration of a single provider call.
//
// ## Implementations
//
// - AES-256-GCM: `cflinkd::cipher::AesGcmCipher`
//
// ## Usage
//
// ```rust,ignore
// use cflink_core::{ApiToken, CredentialCipher};
//
// let sealed = cipher.encrypt(&ApiToken::new("cf-token"))?;
// let token = cipher.decrypt(&sealed)?;
// provider.list_zones(&token).await?;
// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plaintext provider API token
///
/// `Debug` never prints the secret, so tokens can travel inside structs
/// that get logged.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Access the secret, e.g. to build an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

/// Sealed provider token as persisted alongside the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredential {
    /// Per-encryption nonce
    pub nonce: Vec<u8>,
    /// Ciphertext including the authentication tag
    pub ciphertext: Vec<u8>,
}

/// Trait for credential encryption
///
/// Implementations must be thread-safe; one cipher is shared by every
/// request handler and by the scheduler.
pub trait CredentialCipher: Send + Sync {
    /// Seal a plaintext token
    fn encrypt(&self, token: &ApiToken) -> crate::Result<EncryptedCredential>;

    /// Open a sealed token
    ///
    /// Fails with `Error::Crypto` when the credential was sealed under a
    /// different key or has been tampered with.
    fn decrypt(&self, credential: &EncryptedCredential) -> crate::Result<ApiToken>;
}
