use anyhow::Context;
use barakah_ledger::config::Config;
use barakah_ledger::guidance::AzureOpenAiGenerator;
use barakah_ledger::store::{LedgerStore, MemoryStore, SeaOrmStore};
use barakah_ledger::{create_app, with_rate_limit, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = Config::from_env().context("reading configuration")?;

    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            let store = SeaOrmStore::connect(url, 10)
                .await
                .context("connecting to the ledger database")?;
            if config.run_migrations {
                store.migrate().await.context("running migrations")?;
                tracing::info!("migrations applied");
            }
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, nothing will persist");
            Arc::new(MemoryStore::new())
        }
    };

    let mut state = AppState::new(store, config.retry).with_community(config.community);
    match &config.guidance {
        Some(g) => {
            let generator = AzureOpenAiGenerator::new(&g.endpoint, &g.api_key, &g.model)
                .context("building the text generator")?;
            state = state.with_guidance(Arc::new(generator));
        }
        None => tracing::info!("AZURE_OPENAI_* not set; guidance routes will answer 503"),
    }

    let mut app = create_app(state);
    if let Some(per_minute) = config.rate_limit_per_minute {
        app = with_rate_limit(app, per_minute);
        tracing::info!(per_minute, "rate limiting enabled");
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")?;
    Ok(())
}
