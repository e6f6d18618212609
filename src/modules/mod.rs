pub mod books;
pub mod external;

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    db: &Database,
    settings: &Settings,
) -> anyhow::Result<()> {
    registry.register(books::create_module(db.clone()))?;
    registry.register(
        external::create_module(settings.external.clone())
            .context("failed to build the external API client")?,
    )?;
    Ok(())
}
