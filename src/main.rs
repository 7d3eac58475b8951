use std::sync::Arc;

use anyhow::Result;

use petstagram::store::{MemoryStore, PgStore, Store};
use petstagram::{app, config, db, logging};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        media_root = %settings.media_root.display(),
        "Starting Petstagram backend"
    );

    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => {
            let pool = db::create_pool(url, settings.database_max_connections).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set - using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = app::AppState::new(store, settings.clone());
    state.media.ensure_dirs().await?;

    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
