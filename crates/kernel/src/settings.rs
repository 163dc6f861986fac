use std::fmt;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::credential::AppCredential;
use crate::error::InitError;

/// Prefix shared by the credential, root-login and logging variables.
const ENV_PREFIX: &str = "MONGO";
/// Prefix of the host/port variables the application backend also reads.
const HOST_ENV_PREFIX: &str = "MONGODB";

const MAX_DATABASE_NAME_BYTES: usize = 64;
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', '"', '$', ' ', '\0'];

/// Top-level configuration resolved once at process start.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub bootstrap: BootstrapConfig,
    pub connection: ConnectionSettings,
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env` under the process environment.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();
        Self::build(None)
    }

    /// Resolve configuration from an explicit variable map instead of the process environment.
    pub fn from_source(vars: config::Map<String, String>) -> anyhow::Result<Self> {
        Self::build(Some(vars))
    }

    fn build(source: Option<config::Map<String, String>>) -> anyhow::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(environment(ENV_PREFIX, source.clone()))
            .add_source(environment(HOST_ENV_PREFIX, source).keep_prefix(true))
            .build()
            .with_context(|| "failed to build configuration")?;

        let vars: EnvVars = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        Ok(vars.into())
    }
}

// Empty values count as unset, so `MONGO_APP_USERNAME=` still falls back to the default.
fn environment(prefix: &str, source: Option<config::Map<String, String>>) -> config::Environment {
    config::Environment::with_prefix(prefix)
        .ignore_empty(true)
        .source(source)
}

/// Flat view of the recognised variables, keyed by their lowercased name.
///
/// `MONGO_*` keys lose their prefix; `MONGODB_*` keys keep it, so `MONGO_HOST`
/// never stands in for `MONGODB_HOST`.
#[derive(Debug, Deserialize)]
struct EnvVars {
    #[serde(default = "BootstrapConfig::default_database_name")]
    initdb_database: String,
    #[serde(default = "BootstrapConfig::default_username")]
    app_username: String,
    #[serde(default = "BootstrapConfig::default_password")]
    app_password: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default = "ConnectionSettings::default_host")]
    mongodb_host: String,
    #[serde(default = "ConnectionSettings::default_port")]
    mongodb_port: u16,
    #[serde(default)]
    initdb_root_username: Option<String>,
    #[serde(default)]
    initdb_root_password: Option<String>,
    #[serde(default = "ConnectionSettings::default_root_auth_source")]
    initdb_root_auth_source: String,
    #[serde(default)]
    auth_source: Option<String>,
    #[serde(default = "ConnectionSettings::default_server_selection_timeout_ms")]
    server_selection_timeout_ms: u64,
    #[serde(default)]
    initdb_log_format: LogFormat,
}

impl From<EnvVars> for Settings {
    fn from(vars: EnvVars) -> Self {
        Self {
            bootstrap: BootstrapConfig {
                database_name: vars.initdb_database,
                username: vars.app_username,
                password: vars.app_password,
            },
            connection: ConnectionSettings {
                uri: vars.uri,
                host: vars.mongodb_host,
                port: vars.mongodb_port,
                root_username: vars.initdb_root_username,
                root_password: vars.initdb_root_password,
                root_auth_source: vars.initdb_root_auth_source,
                app_auth_source: vars.auth_source,
                server_selection_timeout_ms: vars.server_selection_timeout_ms,
            },
            telemetry: TelemetrySettings {
                log_format: vars.initdb_log_format,
            },
        }
    }
}

/// The application credential to provision, handed by value to the initializer.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub database_name: String,
    pub username: String,
    pub password: String,
}

impl BootstrapConfig {
    fn default_database_name() -> String {
        "app_db".to_string()
    }

    fn default_username() -> String {
        "app_user".to_string()
    }

    fn default_password() -> String {
        "app_pass".to_string()
    }

    /// Reject values the server would refuse or misinterpret.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.username.is_empty() {
            return Err(InitError::invalid_config("username must not be empty"));
        }
        if self.password.is_empty() {
            return Err(InitError::invalid_config("password must not be empty"));
        }

        let name = &self.database_name;
        if name.is_empty() {
            return Err(InitError::invalid_config("database name must not be empty"));
        }
        if name.len() >= MAX_DATABASE_NAME_BYTES {
            return Err(InitError::invalid_config(format!(
                "database name '{}' must be shorter than {} bytes",
                name, MAX_DATABASE_NAME_BYTES
            )));
        }
        if let Some(bad) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
            return Err(InitError::invalid_config(format!(
                "database name '{}' contains forbidden character {:?}",
                name, bad
            )));
        }

        Ok(())
    }

    /// Consume the config into the credential it describes.
    pub fn credential(self) -> AppCredential {
        AppCredential::new(self.username, self.password, self.database_name)
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            database_name: Self::default_database_name(),
            username: Self::default_username(),
            password: Self::default_password(),
        }
    }
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the initializer reaches and authenticates against the server.
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Full connection string; when set, host, port and root login are ignored.
    pub uri: Option<String>,
    pub host: String,
    pub port: u16,
    pub root_username: Option<String>,
    pub root_password: Option<String>,
    /// Database the root login authenticates against.
    pub root_auth_source: String,
    /// `authSource` the application backend uses; unset means the app database.
    pub app_auth_source: Option<String>,
    pub server_selection_timeout_ms: u64,
}

impl ConnectionSettings {
    fn default_host() -> String {
        "localhost".to_string()
    }

    fn default_port() -> u16 {
        27017
    }

    fn default_root_auth_source() -> String {
        "admin".to_string()
    }

    fn default_server_selection_timeout_ms() -> u64 {
        10_000
    }

    /// Root login, present only when both halves are configured.
    pub fn root_credential(&self) -> Option<(&str, &str)> {
        match (&self.root_username, &self.root_password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }

    /// The application's `authSource`, falling back to its own database.
    pub fn app_auth_source<'a>(&'a self, database: &'a str) -> &'a str {
        self.app_auth_source.as_deref().unwrap_or(database)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            uri: None,
            host: Self::default_host(),
            port: Self::default_port(),
            root_username: None,
            root_password: None,
            root_auth_source: Self::default_root_auth_source(),
            app_auth_source: None,
            server_selection_timeout_ms: Self::default_server_selection_timeout_ms(),
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("uri", &self.uri.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("root_username", &self.root_username)
            .field("root_password", &self.root_password.as_ref().map(|_| "<redacted>"))
            .field("root_auth_source", &self.root_auth_source)
            .field("app_auth_source", &self.app_auth_source)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelemetrySettings {
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Role;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn unset_environment_uses_defaults() {
        let settings = Settings::from_source(vars(&[])).unwrap();

        assert_eq!(settings.bootstrap.database_name, "app_db");
        assert_eq!(settings.bootstrap.username, "app_user");
        assert_eq!(settings.bootstrap.password, "app_pass");
        assert_eq!(settings.connection.host, "localhost");
        assert_eq!(settings.connection.port, 27017);
        assert_eq!(settings.connection.root_auth_source, "admin");
        assert_eq!(settings.connection.app_auth_source("app_db"), "app_db");
        assert!(settings.connection.uri.is_none());
        assert_eq!(settings.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn database_override_scopes_the_credential() {
        let settings = Settings::from_source(vars(&[("MONGO_INITDB_DATABASE", "other_db")])).unwrap();

        let credential = settings.bootstrap.credential();
        assert_eq!(credential.database(), "other_db");
        assert_eq!(credential.roles()[0].db, "other_db");
        assert_eq!(credential.roles()[0].role, Role::ReadWrite);
    }

    #[test]
    fn empty_variables_count_as_unset() {
        let settings = Settings::from_source(vars(&[
            ("MONGO_APP_USERNAME", ""),
            ("MONGO_APP_PASSWORD", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(settings.bootstrap.username, "app_user");
        assert_eq!(settings.bootstrap.password, "s3cret");
    }

    #[test]
    fn numeric_looking_password_stays_a_string() {
        let settings = Settings::from_source(vars(&[("MONGO_APP_PASSWORD", "12345")])).unwrap();
        assert_eq!(settings.bootstrap.password, "12345");
    }

    #[test]
    fn connection_variables_are_read_from_both_prefixes() {
        let settings = Settings::from_source(vars(&[
            ("MONGODB_HOST", "mongo"),
            ("MONGODB_PORT", "27018"),
            ("MONGO_INITDB_ROOT_USERNAME", "root"),
            ("MONGO_INITDB_ROOT_PASSWORD", "example"),
            ("MONGO_SERVER_SELECTION_TIMEOUT_MS", "250"),
            ("MONGO_INITDB_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(settings.connection.host, "mongo");
        assert_eq!(settings.connection.port, 27018);
        assert_eq!(settings.connection.root_credential(), Some(("root", "example")));
        assert_eq!(settings.connection.server_selection_timeout(), Duration::from_millis(250));
        assert_eq!(settings.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn app_auth_source_does_not_move_the_root_login() {
        let settings = Settings::from_source(vars(&[("MONGO_AUTH_SOURCE", "app_db")])).unwrap();

        assert_eq!(settings.connection.root_auth_source, "admin");
        assert_eq!(settings.connection.app_auth_source("songs"), "app_db");
    }

    #[test]
    fn root_auth_source_has_its_own_variable() {
        let settings = Settings::from_source(vars(&[("MONGO_INITDB_ROOT_AUTH_SOURCE", "ops")])).unwrap();

        assert_eq!(settings.connection.root_auth_source, "ops");
        assert!(settings.connection.app_auth_source.is_none());
    }

    #[test]
    fn mongo_prefixed_host_and_port_are_ignored() {
        let settings = Settings::from_source(vars(&[
            ("MONGO_HOST", "weird"),
            ("MONGO_PORT", "1"),
        ]))
        .unwrap();

        assert_eq!(settings.connection.host, "localhost");
        assert_eq!(settings.connection.port, 27017);
    }

    #[test]
    fn root_credential_requires_both_halves() {
        let settings = Settings::from_source(vars(&[("MONGO_INITDB_ROOT_USERNAME", "root")])).unwrap();
        assert!(settings.connection.root_credential().is_none());
    }

    #[test]
    fn malformed_port_is_an_error() {
        let err = Settings::from_source(vars(&[("MONGODB_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("deserialize"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let settings = Settings::from_source(vars(&[
            ("MONGO_APP_PASSWORD", "hunter2"),
            ("MONGO_INITDB_ROOT_PASSWORD", "rootpw"),
            ("MONGO_URI", "mongodb://root:rootpw@db:27017"),
        ]))
        .unwrap();

        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("rootpw"));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(BootstrapConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_database_names_are_rejected() {
        let too_long = "x".repeat(64);
        for name in ["", "has.dot", "has space", "dollar$", "slash/", too_long.as_str()] {
            let config = BootstrapConfig {
                database_name: name.to_string(),
                ..BootstrapConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, InitError::InvalidConfig { .. }),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn empty_username_is_rejected() {
        let config = BootstrapConfig {
            username: String::new(),
            ..BootstrapConfig::default()
        };
        assert!(matches!(config.validate(), Err(InitError::InvalidConfig { .. })));
    }
}
