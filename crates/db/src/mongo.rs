use async_trait::async_trait;
use initdb_kernel::{AppCredential, ConnectionSettings, InitError, UserRegistry};
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::Client;

const APP_NAME: &str = "mongo-initdb";

/// Server code for `User "<name>@<db>" already exists`.
const DUPLICATE_USER_CODE: i32 = 51003;
/// Server code `Unauthorized`.
const UNAUTHORIZED_CODE: i32 = 13;

/// Registry backed by a live MongoDB deployment.
pub struct MongoRegistry {
    client: Client,
}

impl MongoRegistry {
    /// Build a client for `settings`. No network traffic happens until the first command.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, InitError> {
        let options = client_options(settings).await?;
        let client = Client::with_options(options).map_err(|err| InitError::connection(err.to_string()))?;

        tracing::debug!(
            target: "initdb-db",
            host = %settings.host,
            port = settings.port,
            from_uri = settings.uri.is_some(),
            "mongodb client ready"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl UserRegistry for MongoRegistry {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn create_user(&self, credential: &AppCredential) -> Result<(), InitError> {
        let database = self.client.database(credential.database());

        database
            .run_command(create_user_command(credential))
            .await
            .map(|_| ())
            .map_err(|err| classify(err, credential))
    }
}

/// Resolve driver options from `MONGO_URI`, or from host, port and the root login.
///
/// Retryable reads and writes are switched off so a failed `createUser` is never resent.
pub async fn client_options(settings: &ConnectionSettings) -> Result<ClientOptions, InitError> {
    let mut options = match &settings.uri {
        Some(uri) => ClientOptions::parse(uri.as_str())
            .await
            .map_err(|err| InitError::invalid_config(format!("invalid MONGO_URI: {}", err)))?,
        None => {
            let address = ServerAddress::parse(format!("{}:{}", settings.host, settings.port))
                .map_err(|err| InitError::invalid_config(format!("invalid server address: {}", err)))?;

            let mut options = ClientOptions::default();
            options.hosts = vec![address];

            if let Some((username, password)) = settings.root_credential() {
                let mut credential = Credential::default();
                credential.username = Some(username.to_string());
                credential.password = Some(password.to_string());
                credential.source = Some(settings.root_auth_source.clone());
                options.credential = Some(credential);
            }

            options
        }
    };

    options.app_name = Some(APP_NAME.to_string());
    options.retry_reads = Some(false);
    options.retry_writes = Some(false);
    if options.server_selection_timeout.is_none() {
        options.server_selection_timeout = Some(settings.server_selection_timeout());
    }

    Ok(options)
}

/// The `createUser` command document for `credential`.
pub fn create_user_command(credential: &AppCredential) -> Document {
    let roles: Vec<Document> = credential
        .roles()
        .into_iter()
        .map(|grant| doc! { "role": grant.role.as_str(), "db": grant.db })
        .collect();

    doc! {
        "createUser": credential.username(),
        "pwd": credential.password(),
        "roles": roles,
    }
}

fn classify(err: MongoError, credential: &AppCredential) -> InitError {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => classify_command(command.code, &command.message, credential),
        ErrorKind::Authentication { message, .. } => {
            InitError::permission_denied(credential.database(), message.clone())
        }
        ErrorKind::ServerSelection { message, .. }
        | ErrorKind::DnsResolve { message, .. }
        | ErrorKind::ConnectionPoolCleared { message, .. } => InitError::connection(message.clone()),
        ErrorKind::Io(io) => InitError::connection(io.to_string()),
        _ => InitError::Driver {
            message: err.to_string(),
        },
    }
}

fn classify_command(code: i32, message: &str, credential: &AppCredential) -> InitError {
    match code {
        DUPLICATE_USER_CODE => InitError::duplicate_user(credential.username(), credential.database()),
        UNAUTHORIZED_CODE => InitError::permission_denied(credential.database(), message),
        code => InitError::Rejected {
            code,
            message: message.to_string(),
        },
    }
}
