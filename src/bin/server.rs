use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing_subscriber::EnvFilter;

use inkpact::{
    auth::jwt::JwtService,
    config::AppConfig,
    db,
    mailer::{HttpMailer, LogMailer, Mailer},
    routes,
    state::AppState,
    store::PgStore,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        public_origin = %config.public_origin,
        mail_configured = config.mail_endpoint.is_some(),
        "loaded configuration"
    );

    let pool = db::init_pool(&config.database_url, config.database_max_pool_size)?;
    {
        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow::anyhow!("failed to run migrations: {err}"))?;
    }

    let store = Arc::new(PgStore::new(pool));
    let mailer: Arc<dyn Mailer> = match config.mail_endpoint.as_ref() {
        Some(endpoint) => Arc::new(HttpMailer::new(endpoint, config.mail_api_key.clone())),
        None => Arc::new(LogMailer),
    };
    let jwt = JwtService::from_config(&config)?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(store, mailer, config, jwt);
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received shutdown signal");
        })
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
