use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;

/// Builds the relational store's connection pool. `max_connections` comes
/// from `config::Settings::store_pool_size` (spec.md §6 "connection pools
/// (store: ≥ 50)") rather than being hard-coded, so deployments can tune it
/// without a code change.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}