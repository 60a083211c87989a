#[macro_use]
extern crate rocket;

use airline_core::booking::BookingEngine;
use airline_core::bus::EventBusAdapter;
use airline_core::config::Settings;
use airline_core::generator::bfs::JourneyConstraints;
use airline_core::generator::JourneyGenerator;
use airline_core::reservation::SeatReservationLayer;
use airline_core::routes::{booking_route, flight_route, search_route, AppState};
use airline_core::search::SearchEngine;
use airline_core::store::{FlightRegistry, JourneyStore};
use airline_core::db;
use rand::Rng;
use rocket::fairing::AdHoc;

/// Chronic-poll interval for C7's consumer loop when the stream blocks for
/// up to `BLOCK_MS` without new entries — keeps the background task from
/// busy-spinning while still reacting quickly once an event arrives.
const BLOCK_MS: usize = 2_000;

#[launch]
async fn rocket() -> _ {
    tracing_subscriber::fmt::init();
    let settings = Settings::from_env();

    let pool = db::connect(&settings.database_url, settings.store_pool_size)
        .await
        .expect("failed to connect to relational store");

    let redis_client =
        redis::Client::open(settings.redis_url.clone()).expect("invalid REDIS_URL");
    let cache_conn = redis_client
        .get_tokio_connection_manager()
        .await
        .expect("failed to connect to cache/reservation store");

    let flights = FlightRegistry::new(pool.clone());
    let journeys = JourneyStore::new(pool.clone());
    let reservations =
        SeatReservationLayer::new(cache_conn.clone(), settings.reservation_ttl);
    let search = SearchEngine::new(
        flights.clone(),
        journeys.clone(),
        cache_conn.clone(),
        settings.search_cache_ttl,
    );
    let booking = BookingEngine::new(
        flights.clone(),
        journeys.clone(),
        reservations.clone(),
        pool.clone(),
    );
    let bus = EventBusAdapter::new(
        cache_conn.clone(),
        settings.bus_partition_count,
        format!("generator-{}", uuid::Uuid::new_v4()),
    );

    let constraints = JourneyConstraints {
        layover_min: chrono::Duration::from_std(settings.layover_min).unwrap(),
        layover_max: chrono::Duration::from_std(settings.layover_max).unwrap(),
        journey_max_duration: chrono::Duration::from_std(settings.journey_max_duration).unwrap(),
        max_legs: settings.max_legs,
    };
    let generator = JourneyGenerator::new(flights.clone(), journeys.clone(), constraints);

    bus.ensure_groups()
        .await
        .expect("failed to initialise event bus consumer groups");

    // C3's consumer loop: a single logical consumer per partition, polling
    // in a background task so it runs alongside the HTTP server (spec.md
    // §4.7, §5 "There is no cooperative single-threaded scheduler").
    {
        let bus = bus.clone();
        let generator = generator.clone();
        tokio::spawn(async move {
            loop {
                if let Err(err) = bus.poll_once(&generator, BLOCK_MS).await {
                    tracing::warn!(error = %err, "event bus poll failed; retrying");
                    // Jittered backoff, same trick the store layer uses against
                    // its own retry loop: avoid every consumer hammering a
                    // still-recovering Redis at the same instant.
                    let millis = rand::thread_rng().gen_range(100..=500);
                    tokio::time::sleep(tokio::time::Duration::from_millis(millis)).await;
                }
            }
        });
    }

    let state = AppState {
        flights,
        search,
        booking,
        bus,
    };

    rocket::build()
        .manage(state)
        .mount(
            "/api",
            routes![
                flight_route::create_flight,
                search_route::search_journeys,
                booking_route::create_booking,
                booking_route::get_booking,
            ],
        )
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}