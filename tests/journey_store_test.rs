use airline_core::domain::journey::{Journey, JourneyStatus, Leg};
use airline_core::store::JourneyStore;
use async_trait::async_trait;
use chrono::Utc;
use ctor::dtor;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use test_context::{test_context, AsyncTestContext};
use uuid::Uuid;

mod common {
    pub mod test_utils;
}
use common::test_utils::TestDb;

struct JourneyStoreContext {
    pool: Pool,
    store: JourneyStore,
}

#[dtor]
fn cleanup() {
    if let Err(e) = TestDb::cleanup_database_sync() {
        eprintln!("failed to cleanup test database: {e}");
    }
}

#[async_trait]
impl AsyncTestContext for JourneyStoreContext {
    async fn setup() -> Self {
        let pool: Pool = TestDb::get_instance(file!())
            .await
            .expect("failed to get test database instance");
        JourneyStoreContext {
            store: JourneyStore::new(pool.clone()),
            pool,
        }
    }
}

async fn seed_flight(pool: &Pool, src: &str, dst: &str, dep_offset_hours: i64) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let dep = now + chrono::Duration::hours(dep_offset_hours);
    let arr = dep + chrono::Duration::hours(2);
    sqlx::query!(
        r#"
        INSERT INTO flights (id, src, dst, dep_utc, arr_utc, aircraft_ref, price, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'A320', ?, 'ACTIVE', ?, ?)
        "#,
        id,
        src,
        dst,
        dep,
        arr,
        Decimal::new(5000, 0),
        now,
        now,
    )
    .execute(pool)
    .await
    .unwrap();
    id
}

fn journey_from_legs(legs: Vec<Leg>, src: &str, dst: &str) -> Journey {
    let now = Utc::now();
    Journey {
        id: Uuid::new_v4(),
        legs,
        src: src.into(),
        dst: dst.into(),
        departure: now,
        arrival: now + chrono::Duration::hours(2),
        total_price: Decimal::new(5000, 0),
        status: JourneyStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

#[test_context(JourneyStoreContext)]
#[tokio::test]
async fn save_journey_is_idempotent_by_canonical_sequence(ctx: &mut JourneyStoreContext) {
    let flight_id = seed_flight(&ctx.pool, "DEL", "BOM", 24).await;
    let journey = journey_from_legs(
        vec![Leg {
            flight_id,
            order: 1,
        }],
        "DEL",
        "BOM",
    );

    let first = ctx.store.save_journey(&journey).await.unwrap();
    // Replay with a freshly-minted id for the same leg sequence (as would
    // happen on at-least-once event redelivery): must be a no-op.
    let mut replay = journey.clone();
    replay.id = Uuid::new_v4();
    let second = ctx.store.save_journey(&replay).await.unwrap();

    assert_eq!(first.id, second.id);

    let matches = ctx
        .store
        .list_journeys_by_route_and_date(
            "DEL",
            "BOM",
            first.departure.date_naive(),
        )
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
}

#[test_context(JourneyStoreContext)]
#[tokio::test]
async fn leg_order_is_part_of_canonical_identity(ctx: &mut JourneyStoreContext) {
    let a = seed_flight(&ctx.pool, "DEL", "BOM", 24).await;
    let b = seed_flight(&ctx.pool, "BOM", "DEL", 30).await;

    let forward = journey_from_legs(
        vec![Leg { flight_id: a, order: 1 }, Leg { flight_id: b, order: 2 }],
        "DEL",
        "DEL",
    );
    let backward = journey_from_legs(
        vec![Leg { flight_id: b, order: 1 }, Leg { flight_id: a, order: 2 }],
        "BOM",
        "BOM",
    );

    ctx.store.save_journey(&forward).await.unwrap();
    ctx.store.save_journey(&backward).await.unwrap();

    let del_matches = ctx
        .store
        .list_journeys_by_route_and_date("DEL", "DEL", forward.departure.date_naive())
        .await
        .unwrap();
    assert_eq!(del_matches.len(), 1);

    let bom_matches = ctx
        .store
        .list_journeys_by_route_and_date("BOM", "BOM", backward.departure.date_naive())
        .await
        .unwrap();
    assert_eq!(bom_matches.len(), 1);
}

#[test_context(JourneyStoreContext)]
#[tokio::test]
async fn journeys_ending_and_starting_at_feed_middle_bridging(ctx: &mut JourneyStoreContext) {
    let a = seed_flight(&ctx.pool, "DEL", "BOM", 24).await;
    let journey = journey_from_legs(vec![Leg { flight_id: a, order: 1 }], "DEL", "BOM");
    ctx.store.save_journey(&journey).await.unwrap();

    let ending_at_bom = ctx.store.journeys_ending_at("BOM").await.unwrap();
    assert_eq!(ending_at_bom.len(), 1);

    let starting_at_del = ctx.store.journeys_starting_at("DEL").await.unwrap();
    assert_eq!(starting_at_del.len(), 1);

    assert!(ctx.store.journeys_starting_at("BOM").await.unwrap().is_empty());
}
