#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

use jobfilter::filters::{FamilyBinding, FilterEngine, RawParams};
use jobfilter::store::MemoryStore;

/// Connects to `TEST_DATABASE_URL`, migrates and empties `jobs`.
/// `None` when no database is configured; callers skip.
pub async fn setup_db() -> Option<PgPool> {
    let _ = dotenvy::dotenv();

    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations failed");

    sqlx::query("TRUNCATE TABLE jobs")
        .execute(&pool)
        .await
        .expect("truncate failed");

    Some(pool)
}

/// Fixed reference instant so tests never race the clock.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub fn raw(pairs: &[(&str, &str)]) -> RawParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn engine(
    store: &Arc<MemoryStore>,
    binding: FamilyBinding,
    pairs: &[(&str, &str)],
) -> FilterEngine {
    FilterEngine::from_raw(&raw(pairs), store.clone(), binding)
        .expect("valid params")
        .with_now(t0())
}
