use std::env;
use std::time::Duration;

/// Process-wide settings, parsed once at startup from the environment.
///
/// Mirrors the teacher's pattern of reading configuration with
/// `std::env::var` behind `dotenv().ok()`, but centralizes the reads into one
/// struct instead of scattering them across `main.rs` and the service
/// constructors, so the constants enumerated in the spec have a single
/// source of truth.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub store_pool_size: u32,

    pub layover_min: Duration,
    pub layover_max: Duration,
    pub journey_max_duration: Duration,
    pub max_legs: usize,
    pub search_cache_ttl: Duration,
    pub reservation_ttl: Duration,

    pub bus_partition_count: u32,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Settings {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string()),
            store_pool_size: env_u32("STORE_POOL_SIZE", 50),

            layover_min: Duration::from_secs(env_u64("LAYOVER_MIN_SECS", 30 * 60)),
            layover_max: Duration::from_secs(env_u64("LAYOVER_MAX_SECS", 4 * 60 * 60)),
            journey_max_duration: Duration::from_secs(env_u64(
                "JOURNEY_MAX_DURATION_SECS",
                24 * 60 * 60,
            )),
            max_legs: env_u32("MAX_LEGS", 3) as usize,
            search_cache_ttl: Duration::from_secs(env_u64("SEARCH_CACHE_TTL_SECS", 10 * 60)),
            reservation_ttl: Duration::from_secs(env_u64("RESERVATION_TTL_SECS", 5 * 60)),

            bus_partition_count: env_u32("BUS_PARTITION_COUNT", 4),
        }
    }

    /// The sort keys `SearchJourneys` accepts; anything else preserves
    /// insertion order (spec.md §4.4 step 5).
    pub fn sort_allowed() -> &'static [&'static str] {
        &["price", "duration"]
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
