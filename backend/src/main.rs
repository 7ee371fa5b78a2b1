use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use repurpose::billing::StripeAdapter;
use repurpose::config::{self, StoreBackend};
use repurpose::content::{GeminiGenerator, HttpTextExtractor};
use repurpose::db::{MemoryStore, PgStore, RecordStore};
use repurpose::routes;
use repurpose::{AppContext, Collaborators, ContextSettings};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

async fn build_store() -> anyhow::Result<Arc<dyn RecordStore>> {
    match *config::RECORD_STORE {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory record store; state is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let db_url = config::DATABASE_URL
                .clone()
                .context("RECORD_STORE=postgres requires DATABASE_URL")?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&db_url)
                .await
                .context("connecting to postgres")?;

            if let Err(error) = sqlx::migrate!().run(&pool).await {
                if *config::ALLOW_MIGRATION_FAILURE {
                    tracing::warn!(
                        ?error,
                        "Database migrations failed but continuing due to ALLOW_MIGRATION_FAILURE"
                    );
                } else {
                    return Err(error).context("running database migrations");
                }
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    // Fail fast if the webhook secret is missing
    let webhook_secret = config::STRIPE_WEBHOOK_SECRET.clone();

    let store = build_store().await?;
    let timeout = Duration::from_secs(*config::HTTP_TIMEOUT_SECS);
    let collaborators = Collaborators {
        billing: Arc::new(StripeAdapter::new(
            config::STRIPE_API_BASE.as_str(),
            config::STRIPE_SECRET_KEY.clone(),
        )),
        extractor: Arc::new(HttpTextExtractor::new(*config::EXTRACT_MAX_CHARS, timeout)),
        generator: Arc::new(GeminiGenerator::new(
            config::GENERATION_API_BASE.as_str(),
            config::GOOGLE_AI_API_KEY.as_str(),
            config::GENERATION_MODEL.as_str(),
            timeout,
        )),
    };
    let settings = ContextSettings {
        webhook_secret,
        quota_mode: *config::QUOTA_MODE,
        price_id: config::STRIPE_PRICE_ID.clone(),
        app_base_url: config::APP_BASE_URL.clone(),
    };
    tracing::info!(
        store = ?*config::RECORD_STORE,
        quota_mode = ?settings.quota_mode,
        "starting repurpose api"
    );

    let app = routes::with_metrics(routes::app(AppContext::new(store, collaborators, settings)));

    let addr: SocketAddr = format!("{}:{}", config::BIND_ADDRESS.as_str(), *config::BIND_PORT)
        .parse()
        .context("parsing bind address")?;
    tracing::info!(%addr, "Listening for incoming connections");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
