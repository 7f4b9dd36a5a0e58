use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use library_db::Database;
use library_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;
use crate::modules::books::repository::{
    BookRepository, InMemoryBookRepository, SqliteBookRepository,
};

/// Storage plus registered modules, ready to serve.
pub struct Application {
    settings: Settings,
    registry: ModuleRegistry,
    database: Option<Database>,
}

/// Open the configured store, register modules, and bring the schema up to date.
pub async fn bootstrap(settings: &Settings) -> anyhow::Result<Application> {
    let (books, database): (Arc<dyn BookRepository>, Option<Database>) =
        if settings.database.in_memory {
            tracing::info!("using in-memory book store");
            (Arc::new(InMemoryBookRepository::new()), None)
        } else {
            let database = Database::connect(&settings.database)
                .await
                .with_context(|| {
                    format!(
                        "failed to open database at {}",
                        settings.database.path.display()
                    )
                })?;
            let books = Arc::new(SqliteBookRepository::new(database.pool().clone()));
            (books, Some(database))
        };

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, books)?;

    if let Some(database) = &database {
        let applied = database
            .apply_migrations(&registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "schema is up to date");
    }

    Ok(Application {
        settings: settings.clone(),
        registry,
        database,
    })
}

/// Apply pending migrations to the file-backed store and report how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    if settings.database.in_memory {
        tracing::info!("in-memory store configured; nothing to migrate");
        return Ok(0);
    }

    let database = Database::connect(&settings.database)
        .await
        .with_context(|| {
            format!(
                "failed to open database at {}",
                settings.database.path.display()
            )
        })?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(
        &mut registry,
        Arc::new(SqliteBookRepository::new(database.pool().clone())),
    )?;

    let applied = database
        .apply_migrations(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    database.close().await;
    Ok(applied)
}

/// Bootstrap and serve until Ctrl-C / SIGTERM.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let app = bootstrap(&settings).await?;
    app.serve(library_http::shutdown_signal()).await
}

impl Application {
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }

    /// Initialize and start modules without binding a socket.
    pub async fn start(&self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_modules(&ctx).await?;
        self.registry.start_modules(&ctx).await
    }

    /// The fully layered router, as served.
    pub fn router(&self) -> Router {
        library_http::build_router(&self.registry, &self.settings)
    }

    /// Start modules, serve until `shutdown` resolves, then stop modules and
    /// close the store.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.start().await?;

        let served = library_http::start_server(&self.registry, &self.settings, shutdown).await;

        self.registry.stop_modules().await?;
        if let Some(database) = &self.database {
            database.close().await;
        }
        served
    }
}
