use anyhow::Context;
use library_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load library settings")?;
    library_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        in_memory = settings.database.in_memory,
        db = %settings.database.path.display(),
        "library-app bootstrap starting"
    );

    library_app::run(settings).await
}
