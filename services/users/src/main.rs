use anyhow::Result;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, health_check, init_pool};
use users::{
    LibraryGrantSynchronizer, MemoryUserStore, PgUserStore, UserStore,
    routes,
    settings::{Settings, StoreBackend},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting users service");

    let settings = Settings::from_env()?;

    let store: Arc<dyn UserStore> = match settings.store {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            PgUserStore::migrate(&pool).await?;
            Arc::new(PgUserStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory user store, users will not survive a restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    // The router keeps the only sender; the listener stops once the server
    // shuts down and the state is dropped.
    if settings.event_queue_capacity == 0 {
        anyhow::bail!("USERS_EVENT_QUEUE_CAPACITY must be at least 1");
    }
    let (library_events, events) = mpsc::channel(settings.event_queue_capacity);
    LibraryGrantSynchronizer::new(store.clone()).listen(events);

    let app = routes::create_router(AppState::new(store, library_events));

    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!("Users service listening on {}", settings.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
