use anyhow::Result;
use auth::{JwtConfig, JwtService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{
    AppState, accounts,
    config::{Settings, StorageBackend},
    repositories::{MemoryStore, PgStore, ReservationStore},
    routes,
};
use common::database::{DatabaseConfig, health_check, init_pool};

async fn open_store(backend: StorageBackend) -> Result<Arc<dyn ReservationStore>> {
    match backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            let store = PgStore::new(pool);
            store.migrate().await?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting reservation API service");

    let settings = Settings::load()?;
    let store = open_store(settings.storage_backend).await?;
    let jwt_service = JwtService::new(JwtConfig::from_env()?);

    if let Some((email, password)) = settings.admin_credentials() {
        if accounts::bootstrap_admin(store.as_ref(), email, password).await? {
            info!("Administrator account {} created", email);
        }
    }

    let app = routes::create_router(AppState::new(store, jwt_service));

    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!("API service listening on {}", settings.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
