use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "shelf-app bootstrap starting"
    );

    let db = Database::open(&settings.database)
        .await
        .context("failed to open database")?;

    let registry = shelf_app::bootstrap(&settings, &db).await?;
    registry.start_modules(&InitCtx { settings: &settings }).await?;

    tracing::info!(modules = registry.module_count(), "shelf-app bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings).await;

    if let Err(err) = registry.stop_modules().await {
        tracing::error!(error = %err, "modules did not stop cleanly");
    }
    db.close().await.context("failed to close database")?;

    served
}
