//! One-shot provisioning of the application credential.

use initdb_kernel::{AppCredential, BootstrapConfig, InitError, UserRegistry};

/// Validate `config`, then create its credential on `registry` with a single request.
///
/// Any failure is returned as-is; nothing is retried.
pub async fn run<R>(config: BootstrapConfig, registry: &R) -> Result<AppCredential, InitError>
where
    R: UserRegistry + ?Sized,
{
    config.validate()?;
    let credential = config.credential();

    tracing::info!(
        registry = registry.name(),
        database = credential.database(),
        username = credential.username(),
        role = %credential.role(),
        "creating application user"
    );

    registry.create_user(&credential).await.inspect_err(|err| {
        tracing::error!(
            database = credential.database(),
            username = credential.username(),
            error = %err,
            "failed to create application user"
        );
    })?;

    tracing::info!(
        database = credential.database(),
        username = credential.username(),
        "application user created"
    );

    Ok(credential)
}
