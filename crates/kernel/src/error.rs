//! Failures of a provisioning run.

use thiserror::Error;

/// Everything that can stop the initializer. None of these are retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("user \"{username}@{database}\" already exists")]
    DuplicateUser { username: String, database: String },

    #[error("not authorized to create users on '{database}': {message}")]
    PermissionDenied { database: String, message: String },

    #[error("storage unavailable: {message}")]
    Connection { message: String },

    #[error("createUser rejected by server (code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("storage driver error: {message}")]
    Driver { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl InitError {
    pub fn duplicate_user(username: impl Into<String>, database: impl Into<String>) -> Self {
        Self::DuplicateUser {
            username: username.into(),
            database: database.into(),
        }
    }

    pub fn permission_denied(database: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            database: database.into(),
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
