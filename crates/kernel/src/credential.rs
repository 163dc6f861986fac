//! The application credential and the role it is granted.

use std::fmt;

/// Database-scoped roles the initializer is allowed to grant.
///
/// Only `readWrite` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    ReadWrite,
}

impl Role {
    /// Name of the built-in role on the server.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::ReadWrite => "readWrite",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role bound to the database it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: Role,
    pub db: String,
}

/// Username/password pair with its single `readWrite` grant on one database.
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredential {
    username: String,
    password: String,
    database: String,
    role: Role,
}

impl AppCredential {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            database: database.into(),
            role: Role::ReadWrite,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Grants to attach on creation, always scoped to the credential's own database.
    pub fn roles(&self) -> Vec<RoleGrant> {
        vec![RoleGrant {
            role: self.role,
            db: self.database.clone(),
        }]
    }

    /// Connection string the application would use, with the password masked.
    pub fn redacted_uri(&self, host: &str, port: u16, auth_source: &str) -> String {
        format!(
            "mongodb://{}:****@{}:{}/{}?authSource={}",
            self.username, host, port, self.database, auth_source
        )
    }
}

impl fmt::Debug for AppCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("role", &self.role)
            .finish()
    }
}
