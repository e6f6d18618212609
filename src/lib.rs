//! Shelf application library: the `books` and `external` modules and the
//! bootstrap that wires them into a [`ModuleRegistry`].

pub mod modules;
pub mod utils;

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry holding every shelf module.
pub fn register_modules(settings: &Settings, db: &Database) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db, settings)?;
    Ok(registry)
}

/// Register modules, apply pending migrations and initialize every module.
///
/// The returned registry is ready to be started and served.
pub async fn bootstrap(settings: &Settings, db: &Database) -> anyhow::Result<ModuleRegistry> {
    let registry = register_modules(settings, db)?;

    let applied = db
        .migrate(registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "migrations up to date");

    registry.init_modules(&InitCtx { settings }).await?;
    Ok(registry)
}
