use anyhow::Context;
use initdb_db::MongoRegistry;
use initdb_kernel::settings::Settings;
use mongo_initdb::bootstrap;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load initdb settings")?;
    initdb_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        host = %settings.connection.host,
        port = settings.connection.port,
        database = %settings.bootstrap.database_name,
        "mongo-initdb starting"
    );

    let registry = MongoRegistry::connect(&settings.connection).await?;
    let credential = bootstrap::run(settings.bootstrap, &registry).await?;

    tracing::info!(
        uri = %credential.redacted_uri(
            &settings.connection.host,
            settings.connection.port,
            settings.connection.app_auth_source(credential.database()),
        ),
        "application credential provisioned"
    );

    Ok(())
}
