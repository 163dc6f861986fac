use async_trait::async_trait;

use crate::credential::AppCredential;
use crate::error::InitError;

/// The storage system's user registry, seen from the initializer.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Create `credential` on its own database with its role grants.
    ///
    /// Issued exactly once per run. Fails with [`InitError::DuplicateUser`] when
    /// the user already exists on that database.
    async fn create_user(&self, credential: &AppCredential) -> Result<(), InitError>;
}
