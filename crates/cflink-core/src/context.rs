//! Request-scoped caller context.

use crate::model::{LogScope, UserId};
use crate::traits::EncryptedCredential;

/// Who is calling, and with which provider credential
///
/// Built per request (or per user in a scheduler run) and passed into every
/// reconciler and record-manager call. The credential stays sealed until
/// the moment a provider call needs it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub owner: UserId,
    pub credential: EncryptedCredential,
}

impl RequestContext {
    pub fn new(owner: UserId, credential: EncryptedCredential) -> Self {
        Self { owner, credential }
    }

    /// Log scope for activity performed on behalf of this caller
    pub fn scope(&self) -> LogScope {
        LogScope::User(self.owner)
    }
}

impl From<&crate::model::User> for RequestContext {
    fn from(user: &crate::model::User) -> Self {
        Self::new(user.id, user.credential.clone())
    }
}
