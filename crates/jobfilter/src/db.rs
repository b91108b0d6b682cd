use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Pool for dashboard reads. `statement_timeout_ms` bounds every query on
/// the server side; the filter engine has no timeouts of its own.
pub async fn make_pool(
    database_url: &str,
    statement_timeout_ms: Option<u64>,
) -> anyhow::Result<PgPool> {
    let max_connections = std::env::var("JOBFILTER_DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(4)
        .clamp(1, 32);

    let acquire_timeout_secs = std::env::var("JOBFILTER_DB_ACQUIRE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10)
        .clamp(1, 60);

    let mut opts = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs));

    opts = opts.after_connect(move |conn, _meta| {
        Box::pin(async move {
            if let Some(ms) = statement_timeout_ms {
                sqlx::query(&format!("SET statement_timeout = {ms}"))
                    .execute(&mut *conn)
                    .await?;
            }
            sqlx::query("SET jit = OFF").execute(&mut *conn).await?;
            Ok(())
        })
    });

    let pool = opts.connect(database_url).await?;
    tracing::info!(max_connections, acquire_timeout_secs, "database pool ready");

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
