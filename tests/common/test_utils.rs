use dotenv::dotenv;
use once_cell::sync::OnceCell;
use sqlx::mysql::MySqlPool as Pool;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::Error;
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

static TEST_DB: OnceCell<Mutex<Option<TestDb>>> = OnceCell::new();
static DB_NAME: OnceCell<String> = OnceCell::new();

#[derive(Debug)]
pub struct TestDb {
    pub db_name: String,
}

async fn create_connection_pool_without_db() -> Result<Pool, Error> {
    dotenv().ok();
    let db_url = env::var("ADMIN_DATABASE_URL").expect("ADMIN_DATABASE_URL must be set in .env file");
    let base_url = db_url.split('/').collect::<Vec<&str>>()[..3].join("/");

    MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&base_url)
        .await
}

async fn create_connection_pool_with_db(db_name: &str) -> Result<Pool, Error> {
    dotenv().ok();
    let db_url = env::var("ADMIN_DATABASE_URL").expect("ADMIN_DATABASE_URL must be set in .env file");
    let base_url = db_url.split('/').collect::<Vec<&str>>()[..3].join("/");

    MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&format!("{}/{}", base_url, db_name))
        .await
}

impl TestDb {
    /// One fresh database per test binary (file!()-keyed), matching the
    /// teacher's `tests/common/test_utils.rs` pattern.
    pub async fn get_instance(file_path: &str) -> Result<Pool, Error> {
        let test_name = file_path
            .split(['/', '\\'])
            .last()
            .unwrap_or(file_path)
            .trim_end_matches(".rs");

        let test_db = TEST_DB.get_or_init(|| Mutex::new(None));
        let mut guard = test_db.lock().await;

        if guard.is_none() {
            *guard = Some(Self::setup_database(test_name).await?);
        }

        let db_name = guard.as_ref().unwrap().db_name.clone();
        drop(guard);

        create_connection_pool_with_db(&db_name).await
    }

    async fn setup_database(test_name: &str) -> Result<Self, Error> {
        let db_name = DB_NAME
            .get_or_init(|| {
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs();
                format!("airline_core_test_{}_{}", test_name, timestamp)
            })
            .clone();

        let admin_pool = create_connection_pool_without_db().await?;
        sqlx::query(&format!("CREATE DATABASE {}", db_name))
            .execute(&admin_pool)
            .await?;

        let pool = create_connection_pool_with_db(&db_name).await?;
        Self::create_tables(&pool).await?;

        Ok(Self { db_name })
    }

    /// Mirrors the semantic layout of spec.md §6 "Persisted state layout"
    /// for the three relational entities the core owns (C1's flights and
    /// seats, C2's journeys, C6's bookings). `id` columns are `BINARY(16)`
    /// to match sqlx's MySQL `Uuid` encoding.
    async fn create_tables(pool: &Pool) -> Result<(), Error> {
        let tables = vec![
            "CREATE TABLE IF NOT EXISTS flights (
                id BINARY(16) NOT NULL PRIMARY KEY,
                src CHAR(3) NOT NULL,
                dst CHAR(3) NOT NULL,
                dep_utc DATETIME(6) NOT NULL,
                arr_utc DATETIME(6) NOT NULL,
                aircraft_ref VARCHAR(64) NOT NULL,
                price DECIMAL(12,2) NOT NULL,
                status VARCHAR(16) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                INDEX idx_flights_dep (dep_utc),
                INDEX idx_flights_aircraft_dep (aircraft_ref, dep_utc)
            )",
            "CREATE TABLE IF NOT EXISTS seats (
                id BINARY(16) NOT NULL PRIMARY KEY,
                flight_id BINARY(16) NOT NULL,
                label VARCHAR(8) NOT NULL,
                status VARCHAR(16) NOT NULL,
                booking_id BINARY(16) NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                CONSTRAINT seats_flight_fk FOREIGN KEY (flight_id) REFERENCES flights(id) ON DELETE CASCADE,
                CONSTRAINT seats_flight_label_uindex UNIQUE (flight_id, label)
            )",
            "CREATE TABLE IF NOT EXISTS journeys (
                id BINARY(16) NOT NULL PRIMARY KEY,
                legs_json TEXT NOT NULL,
                canonical_sequence VARCHAR(1024) NOT NULL,
                src CHAR(3) NOT NULL,
                dst CHAR(3) NOT NULL,
                dep_utc DATETIME(6) NOT NULL,
                arr_utc DATETIME(6) NOT NULL,
                total_price DECIMAL(12,2) NOT NULL,
                status VARCHAR(16) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                CONSTRAINT journeys_canonical_uindex UNIQUE (canonical_sequence),
                INDEX idx_journeys_route_date (src, dst, dep_utc)
            )",
            "CREATE TABLE IF NOT EXISTS bookings (
                id BINARY(16) NOT NULL PRIMARY KEY,
                user_id BINARY(16) NOT NULL,
                journey_id BINARY(16) NOT NULL,
                pax_count INT UNSIGNED NOT NULL,
                status VARCHAR(16) NOT NULL,
                payment_ref VARCHAR(128) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                CONSTRAINT bookings_journey_fk FOREIGN KEY (journey_id) REFERENCES journeys(id)
            )",
        ];

        for create_sql in tables {
            sqlx::query(create_sql).execute(pool).await?;
        }

        Ok(())
    }

    pub fn cleanup_database_sync() -> Result<(), Box<dyn std::error::Error>> {
        dotenv().ok();
        let db_url = env::var("ADMIN_DATABASE_URL").expect("ADMIN_DATABASE_URL must be set in .env file");
        let url_parts: Vec<&str> = db_url.split("://").nth(1).unwrap().split('@').collect();
        let auth = url_parts[0].split(':').collect::<Vec<&str>>();
        let username = auth[0];
        let password = auth[1];

        if let Some(db_name) = DB_NAME.get() {
            let output = std::process::Command::new("mysql")
                .arg("-u")
                .arg(username)
                .arg(format!("-p{}", password))
                .arg("-e")
                .arg(format!("DROP DATABASE IF EXISTS {};", db_name))
                .output()?;

            if !output.status.success() {
                return Err(format!(
                    "failed to drop test database: {}",
                    String::from_utf8_lossy(&output.stderr)
                )
                .into());
            }
        }

        Ok(())
    }
}
