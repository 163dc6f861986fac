use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use initdb_kernel::{AppCredential, InitError, UserRegistry};
use tokio::sync::Mutex;

/// In-process user registry keyed by `(database, username)`.
///
/// Mirrors the server's duplicate-user behaviour and can be told to act as an
/// unreachable server or an under-privileged login.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    users: Mutex<HashMap<(String, String), AppCredential>>,
    unreachable: bool,
    unauthorized: bool,
    attempts: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request fails as if no server could be selected.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every request fails as if the login lacked `createUser` privileges.
    pub fn unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    /// Stored credential for `username` on `database`, if any.
    pub async fn get(&self, database: &str, username: &str) -> Option<AppCredential> {
        let users = self.users.lock().await;
        users.get(&(database.to_string(), username.to_string())).cloned()
    }

    /// Number of users stored across all databases.
    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Number of `create_user` requests received, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRegistry for MemoryRegistry {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create_user(&self, credential: &AppCredential) -> Result<(), InitError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.unreachable {
            return Err(InitError::connection("no servers available for selection"));
        }
        if self.unauthorized {
            return Err(InitError::permission_denied(
                credential.database(),
                format!("not authorized on {} to execute command createUser", credential.database()),
            ));
        }

        let key = (credential.database().to_string(), credential.username().to_string());
        let mut users = self.users.lock().await;
        if users.contains_key(&key) {
            return Err(InitError::duplicate_user(credential.username(), credential.database()));
        }
        users.insert(key, credential.clone());

        Ok(())
    }
}
