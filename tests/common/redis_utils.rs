use dotenv::dotenv;
use redis::aio::ConnectionManager;
use std::env;

/// Live connection manager against `REDIS_URL` (or localhost), matching how
/// `main.rs` wires C5/C4/C7. Tests that exercise these components need a
/// real Redis instance; there is no in-memory fake for `EVAL`/`XADD`.
pub async fn connection_manager() -> ConnectionManager {
    dotenv().ok();
    let url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let client = redis::Client::open(url).expect("invalid REDIS_URL");
    client
        .get_tokio_connection_manager()
        .await
        .expect("failed to connect to Redis for tests")
}
