use jobfilter::api;
use jobfilter::config;
use jobfilter::db;
use jobfilter::store::PgStore;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = config::Config::from_env()?;

    tracing::info!(
        addr = %cfg.admin_addr,
        default_limit = cfg.default_limit,
        max_limit = cfg.max_limit,
        statement_timeout_ms = ?cfg.statement_timeout_ms,
        migrate_on_startup = cfg.migrate_on_startup,
        "dashboard starting"
    );

    let pool = db::make_pool(&cfg.database_url, cfg.statement_timeout_ms).await?;
    if cfg.migrate_on_startup {
        db::run_migrations(&pool).await?;
        tracing::info!("migrations applied");
    }

    let api_state = api::ApiState::new(Arc::new(PgStore::new(pool)))
        .with_limits(cfg.default_limit, cfg.max_limit);
    let app = api::router(api_state);

    let listener = tokio::net::TcpListener::bind(&cfg.admin_addr).await?;
    tracing::info!("dashboard listening on http://{}", cfg.admin_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    Ok(())
}
