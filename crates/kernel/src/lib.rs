pub mod credential;
pub mod error;
pub mod registry;
pub mod settings;

pub use credential::{AppCredential, Role, RoleGrant};
pub use error::InitError;
pub use registry::UserRegistry;
pub use settings::{BootstrapConfig, ConnectionSettings, LogFormat, Settings, TelemetrySettings};
